use tracing::debug;

use crate::error::WizardError;
use crate::models::{StepGraph, StepId, WizardState};

/// Moves a wizard through its step graph. Holds no state of its own; every
/// transition is applied to the `WizardState` it is handed.
pub struct StepController<'a> {
    graph: &'a StepGraph,
}

impl<'a> StepController<'a> {
    pub fn new(graph: &'a StepGraph) -> Self {
        Self { graph }
    }

    /// Fresh state on the initial step with the flow's default selections.
    pub fn initial_state(&self) -> WizardState {
        let mut state = WizardState::new(self.graph.initial());
        for (key, value) in self.graph.defaults() {
            state.selections.insert(*key, value.clone());
        }
        state
    }

    pub fn advance(&self, state: &mut WizardState) -> Result<StepId, WizardError> {
        let current = state.current_step();
        if current.is_terminal() {
            return Err(WizardError::Finished(current));
        }

        let step = self
            .graph
            .step(current)
            .ok_or(WizardError::UnknownStep(current))?;

        let missing = step.missing(&state.selections);
        if !missing.is_empty() {
            debug!("Cannot leave {}: missing {:?}", current, missing);
            return Err(WizardError::Validation { step: current, missing });
        }

        let next = step
            .resolve_next(&state.selections)
            .ok_or(WizardError::NoNextStep(current))?;

        if self.graph.step(next).is_none() {
            return Err(WizardError::UnknownStep(next));
        }

        // A computed branch may lead back to a step already visited; rewind to it
        // instead of recording it twice.
        match state.step_history.iter().position(|step| *step == next) {
            Some(position) => state.step_history.truncate(position + 1),
            None => state.step_history.push(next),
        }

        debug!("Advanced from {} to {}", current, next);
        Ok(next)
    }

    /// Steps back one entry. Returns the step that was abandoned, or `None` when
    /// already on the first step or finished.
    pub fn retreat(&self, state: &mut WizardState) -> Option<StepId> {
        let current = state.current_step();
        if current.is_terminal() || state.step_history.len() <= 1 {
            return None;
        }

        let left = state.step_history.pop();
        debug!("Retreated from {} to {}", current, state.current_step());
        left
    }

    pub fn reset(&self, state: &mut WizardState) {
        *state = self.initial_state();
        debug!("Wizard reset to {}", state.current_step());
    }

    /// Records a successful submission by moving onto the terminal display step.
    pub fn finish(&self, state: &mut WizardState) -> StepId {
        let terminal = self.graph.terminal();
        if state.current_step() != terminal {
            state.step_history.push(terminal);
        }
        terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldKey, FieldValue, Selections, StepDefinition};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn choose_after_primary(selections: &Selections) -> StepId {
        match selections.text(FieldKey::AppointmentType).as_deref() {
            Some("Walk-in") => StepId::Confirm,
            _ => StepId::SelectSecondary,
        }
    }

    fn graph() -> StepGraph {
        StepGraph::builder(StepId::ChooseFlow)
            .step(StepDefinition::new(StepId::ChooseFlow).requires([FieldKey::AppointmentType]).then(StepId::SelectPrimary))
            .step(StepDefinition::new(StepId::SelectPrimary).requires([FieldKey::HospitalId]).branch(choose_after_primary))
            .step(StepDefinition::new(StepId::SelectSecondary).requires([FieldKey::DoctorId]).then(StepId::Confirm))
            .step(StepDefinition::new(StepId::Confirm))
            .default_value(FieldKey::AppointmentType, FieldValue::text("Consultation"))
            .build(StepId::Success)
            .expect("valid graph")
    }

    fn filled_state(controller: &StepController<'_>) -> WizardState {
        let mut state = controller.initial_state();
        state.selections.insert(FieldKey::HospitalId, FieldValue::text("hosp-1"));
        state.selections.insert(FieldKey::DoctorId, FieldValue::text("doc-1"));
        state
    }

    #[test]
    fn test_initial_state_seeds_defaults() {
        let graph = graph();
        let state = StepController::new(&graph).initial_state();

        assert_eq!(state.step_history(), &[StepId::ChooseFlow]);
        assert_eq!(state.selections().text(FieldKey::AppointmentType).as_deref(), Some("Consultation"));
    }

    #[test]
    fn test_advance_requires_fields_of_active_step() {
        let graph = graph();
        let controller = StepController::new(&graph);
        let mut state = controller.initial_state();

        assert_eq!(controller.advance(&mut state), Ok(StepId::SelectPrimary));
        assert_eq!(
            controller.advance(&mut state),
            Err(WizardError::Validation {
                step: StepId::SelectPrimary,
                missing: vec![FieldKey::HospitalId],
            })
        );
        assert_eq!(state.current_step(), StepId::SelectPrimary);
    }

    #[test]
    fn test_computed_next_follows_selections() {
        let graph = graph();
        let controller = StepController::new(&graph);
        let mut state = filled_state(&controller);
        state.selections.insert(FieldKey::AppointmentType, FieldValue::text("Walk-in"));

        controller.advance(&mut state).expect("choose flow");
        assert_eq!(controller.advance(&mut state), Ok(StepId::Confirm));
        assert_eq!(state.step_history(), &[StepId::ChooseFlow, StepId::SelectPrimary, StepId::Confirm]);
    }

    #[test]
    fn test_confirm_step_cannot_be_advanced() {
        let graph = graph();
        let controller = StepController::new(&graph);
        let mut state = filled_state(&controller);

        for _ in 0..3 {
            controller.advance(&mut state).expect("advance");
        }
        assert_eq!(state.current_step(), StepId::Confirm);
        assert_eq!(controller.advance(&mut state), Err(WizardError::NoNextStep(StepId::Confirm)));
    }

    #[test]
    fn test_retreat_keeps_selections() {
        let graph = graph();
        let controller = StepController::new(&graph);
        let mut state = filled_state(&controller);

        assert_eq!(controller.retreat(&mut state), None);

        controller.advance(&mut state).expect("advance");
        controller.advance(&mut state).expect("advance");
        assert_eq!(controller.retreat(&mut state), Some(StepId::SelectSecondary));
        assert_eq!(state.current_step(), StepId::SelectPrimary);
        assert_eq!(state.selections().text(FieldKey::HospitalId).as_deref(), Some("hosp-1"));
    }

    #[test]
    fn test_finish_and_reset() {
        let graph = graph();
        let controller = StepController::new(&graph);
        let mut state = filled_state(&controller);

        assert_eq!(controller.finish(&mut state), StepId::Success);
        assert_matches!(controller.advance(&mut state), Err(WizardError::Finished(StepId::Success)));
        assert_eq!(controller.retreat(&mut state), None);

        controller.reset(&mut state);
        assert_eq!(state.step_history(), &[StepId::ChooseFlow]);
        assert!(!state.selections().contains(FieldKey::HospitalId));
        assert!(state.selections().contains(FieldKey::AppointmentType));
    }

    proptest! {
        #[test]
        fn prop_history_never_empties_or_repeats(moves in proptest::collection::vec(any::<bool>(), 0..64)) {
            let graph = graph();
            let controller = StepController::new(&graph);
            let mut state = filled_state(&controller);

            for forward in moves {
                if forward {
                    let _ = controller.advance(&mut state);
                } else {
                    controller.retreat(&mut state);
                }

                let history = state.step_history();
                prop_assert!(!history.is_empty());
                prop_assert!(history.windows(2).all(|pair| pair[0] != pair[1]));
                prop_assert_eq!(history[0], StepId::ChooseFlow);
            }
        }
    }
}
