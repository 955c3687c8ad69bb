use tracing::debug;

use crate::error::WizardError;
use crate::models::{FieldKey, FieldValue, Selections, StepGraph};
use crate::validation::validate_field;

/// Merges user input into the selections and keeps derived fields consistent.
pub struct SelectionAccumulator<'a> {
    graph: &'a StepGraph,
}

impl<'a> SelectionAccumulator<'a> {
    pub fn new(graph: &'a StepGraph) -> Self {
        Self { graph }
    }

    /// Validates and stores `value`, then deletes every field derived from `key`.
    /// Returns the fields that were cleared.
    pub fn set_field(
        &self,
        selections: &mut Selections,
        key: FieldKey,
        value: FieldValue,
    ) -> Result<Vec<FieldKey>, WizardError> {
        validate_field(key, &value)?;

        selections.insert(key, value);
        let cleared = self.clear_derived(selections, key);

        debug!("Set {} (cleared {:?})", key, cleared);
        Ok(cleared)
    }

    /// Removes `key` and everything derived from it. Returns every removed field,
    /// `key` included when it was set.
    pub fn clear_field(&self, selections: &mut Selections, key: FieldKey) -> Vec<FieldKey> {
        let mut cleared = Vec::new();
        if selections.remove(key).is_some() {
            cleared.push(key);
        }
        cleared.extend(self.clear_derived(selections, key));
        cleared
    }

    fn clear_derived(&self, selections: &mut Selections, key: FieldKey) -> Vec<FieldKey> {
        self.graph
            .derived_from(key)
            .into_iter()
            .filter(|derived| selections.remove(*derived).is_some())
            .collect()
    }

    /// Required fields still missing anywhere on the path the selections lead down.
    pub fn missing_fields(&self, selections: &Selections) -> Vec<FieldKey> {
        let mut missing = Vec::new();
        for step_id in self.graph.path(selections) {
            if let Some(step) = self.graph.step(step_id) {
                for key in step.missing(selections) {
                    if !missing.contains(&key) {
                        missing.push(key);
                    }
                }
            }
        }
        missing
    }

    pub fn is_complete(&self, selections: &Selections) -> bool {
        self.missing_fields(selections).is_empty()
    }
}
