use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::WizardError;
use crate::models::{
    ConfirmationRecord, FieldKey, FieldValue, FilterParams, RemoteOptionSet, ResourceType, Selections,
    StepGraph, StepId, SubmissionStatus, WizardState, WizardView,
};
use crate::services::accumulator::SelectionAccumulator;
use crate::services::backend::PortalBackend;
use crate::services::controller::StepController;
use crate::services::finalizer::SubmissionFinalizer;
use crate::services::gateway::{FetchOutcome, LookupGateway};

/// A concrete wizard: its step graph plus how its selections become a request.
pub trait WizardFlow: Send + Sync {
    fn name(&self) -> &'static str;

    fn graph(&self) -> &StepGraph;

    fn submission_resource(&self) -> ResourceType;

    fn build_payload(&self, selections: &Selections) -> Result<Value, WizardError>;

    /// Fixed parameters sent with every lookup of `key`, on top of its dependencies.
    fn lookup_filter(&self, _key: FieldKey) -> FilterParams {
        FilterParams::new()
    }
}

/// One running wizard instance. It exclusively owns its state; every mutation goes
/// through the transition methods below.
///
/// Locks are always taken state first, option sets second.
pub struct WizardSession {
    flow: Arc<dyn WizardFlow>,
    backend: Arc<dyn PortalBackend>,
    state: RwLock<WizardState>,
    gateway: LookupGateway,
    finalizer: SubmissionFinalizer,
}

impl WizardSession {
    pub fn new(flow: Arc<dyn WizardFlow>, backend: Arc<dyn PortalBackend>) -> Self {
        let state = StepController::new(flow.graph()).initial_state();
        info!("Starting {} wizard at {}", flow.name(), state.current_step());

        Self {
            gateway: LookupGateway::new(Arc::clone(&backend)),
            flow,
            backend,
            state: RwLock::new(state),
            finalizer: SubmissionFinalizer::new(),
        }
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow.name()
    }

    fn controller(&self) -> StepController<'_> {
        StepController::new(self.flow.graph())
    }

    fn accumulator(&self) -> SelectionAccumulator<'_> {
        SelectionAccumulator::new(self.flow.graph())
    }

    fn ensure_editable(&self, state: &WizardState) -> Result<(), WizardError> {
        if self.finalizer.is_in_flight() {
            return Err(WizardError::SubmissionInFlight);
        }
        let current = state.current_step();
        if current.is_terminal() {
            return Err(WizardError::Finished(current));
        }
        Ok(())
    }

    pub async fn current_step(&self) -> StepId {
        self.state.read().await.current_step()
    }

    pub async fn step_history(&self) -> Vec<StepId> {
        self.state.read().await.step_history().to_vec()
    }

    pub async fn selections(&self) -> Selections {
        self.state.read().await.selections().clone()
    }

    // --------------------------------------------------------------------------
    // Selection accumulator
    // --------------------------------------------------------------------------

    pub async fn set_field(&self, key: FieldKey, value: FieldValue) -> Result<Vec<FieldKey>, WizardError> {
        let mut state = self.state.write().await;
        self.ensure_editable(&state)?;

        let cleared = self.accumulator().set_field(&mut state.selections, key, value)?;

        let mut changed = cleared.clone();
        changed.push(key);
        self.discard_options_depending_on(&changed).await;

        Ok(cleared)
    }

    /// Stores the option with `option_id` from the loaded option set for `key`.
    pub async fn select_option(&self, key: FieldKey, option_id: &str) -> Result<Vec<FieldKey>, WizardError> {
        let option = self
            .gateway
            .find_option(key, option_id)
            .await
            .ok_or_else(|| WizardError::InvalidValue {
                field: key,
                reason: format!("{} is not one of the loaded options", option_id),
            })?;

        self.set_field(key, FieldValue::Choice(option)).await
    }

    pub async fn clear_field(&self, key: FieldKey) -> Result<Vec<FieldKey>, WizardError> {
        let mut state = self.state.write().await;
        self.ensure_editable(&state)?;

        let cleared = self.accumulator().clear_field(&mut state.selections, key);
        self.discard_options_depending_on(&cleared).await;

        Ok(cleared)
    }

    async fn discard_options_depending_on(&self, changed: &[FieldKey]) {
        let stale: Vec<FieldKey> = self
            .flow
            .graph()
            .lookups()
            .iter()
            .filter(|lookup| lookup.depends_on_any(changed))
            .map(|lookup| lookup.key)
            .collect();

        if !stale.is_empty() {
            self.gateway.invalidate_many(&stale).await;
        }
    }

    pub async fn missing_fields(&self) -> Vec<FieldKey> {
        let state = self.state.read().await;
        self.accumulator().missing_fields(&state.selections)
    }

    pub async fn is_complete(&self) -> bool {
        self.missing_fields().await.is_empty()
    }

    // --------------------------------------------------------------------------
    // Step controller
    // --------------------------------------------------------------------------

    pub async fn advance(&self) -> Result<StepId, WizardError> {
        let mut state = self.state.write().await;
        self.ensure_editable(&state)?;
        self.controller().advance(&mut state)
    }

    /// Goes back one step, keeping every selection. Lookups that belonged to the
    /// abandoned step are cancelled. Returns the step now shown.
    pub async fn retreat(&self) -> Result<StepId, WizardError> {
        let mut state = self.state.write().await;
        if self.finalizer.is_in_flight() {
            return Err(WizardError::SubmissionInFlight);
        }

        if let Some(left) = self.controller().retreat(&mut state) {
            let abandoned: Vec<FieldKey> = self
                .flow
                .graph()
                .lookups_for_step(left)
                .map(|lookup| lookup.key)
                .collect();
            self.gateway.invalidate_many(&abandoned).await;
        }

        Ok(state.current_step())
    }

    pub async fn reset(&self) -> Result<(), WizardError> {
        let mut state = self.state.write().await;
        if self.finalizer.is_in_flight() {
            return Err(WizardError::SubmissionInFlight);
        }

        self.controller().reset(&mut state);
        self.gateway.invalidate_all().await;
        self.finalizer.clear().await;

        info!("{} wizard reset", self.flow.name());
        Ok(())
    }

    // --------------------------------------------------------------------------
    // Remote lookup gateway
    // --------------------------------------------------------------------------

    /// Loads the options for `key` using the current selections. Calling it again
    /// is the retry path after a failure.
    pub async fn load_options(&self, key: FieldKey) -> Result<FetchOutcome, WizardError> {
        let lookup = self
            .flow
            .graph()
            .lookup(key)
            .ok_or(WizardError::UnknownLookup(key))?
            .clone();

        // The ticket is taken under the state lock so a concurrent edit either sees
        // this request and invalidates it, or happened before the filter was built.
        let (ticket, filter) = {
            let state = self.state.read().await;

            let missing: Vec<FieldKey> = lookup
                .depends_on
                .iter()
                .copied()
                .filter(|dep| !state.selections.contains(*dep))
                .collect();
            if !missing.is_empty() {
                return Err(WizardError::MissingDependency { key, missing });
            }

            let filter = lookup
                .depends_on
                .iter()
                .fold(self.flow.lookup_filter(key), |filter, dep| {
                    filter.with(dep.wire_name(), state.selections.text(*dep).unwrap_or_default())
                });

            (self.gateway.begin(key).await, filter)
        };

        let result = self.gateway.request(lookup.resource, &filter).await;
        Ok(self.gateway.complete(ticket, result).await)
    }

    /// Loads every lookup of the current step whose dependencies are selected.
    pub async fn refresh_step_options(&self) -> Vec<(FieldKey, FetchOutcome)> {
        let keys: Vec<FieldKey> = {
            let state = self.state.read().await;
            let current = state.current_step();
            self.flow
                .graph()
                .lookups_for_step(current)
                .filter(|lookup| lookup.depends_on.iter().all(|dep| state.selections.contains(*dep)))
                .map(|lookup| lookup.key)
                .collect()
        };

        let outcomes = join_all(keys.iter().map(|key| self.load_options(*key))).await;

        keys.into_iter()
            .zip(outcomes)
            .filter_map(|(key, outcome)| outcome.ok().map(|outcome| (key, outcome)))
            .collect()
    }

    pub async fn option_set(&self, key: FieldKey) -> Option<RemoteOptionSet> {
        self.gateway.option_set(key).await
    }

    // --------------------------------------------------------------------------
    // Submission finalizer
    // --------------------------------------------------------------------------

    pub async fn submit(&self) -> Result<ConfirmationRecord, WizardError> {
        if !self.finalizer.try_begin() {
            debug!("Ignoring submit while another one is in flight");
            return Err(WizardError::SubmissionInFlight);
        }

        let payload = {
            let state = self.state.read().await;
            match self.prepare_payload(&state) {
                Ok(payload) => payload,
                Err(e) => {
                    self.finalizer.release();
                    return Err(e);
                }
            }
        };

        self.finalizer.mark_in_flight().await;
        info!("Submitting {} wizard", self.flow.name());
        let result = self
            .backend
            .create_resource(self.flow.submission_resource(), payload)
            .await;

        let mut state = self.state.write().await;
        let outcome = self.finalizer.record(result).await;
        if outcome.is_ok() {
            let terminal = self.controller().finish(&mut state);
            info!("{} wizard finished at {}", self.flow.name(), terminal);
        }
        self.finalizer.release();

        outcome
    }

    fn prepare_payload(&self, state: &WizardState) -> Result<Value, WizardError> {
        let current = state.current_step();
        if current.is_terminal() {
            return Err(WizardError::Finished(current));
        }

        let missing = self.accumulator().missing_fields(&state.selections);
        if !missing.is_empty() {
            return Err(WizardError::Incomplete { missing });
        }

        if !self.flow.graph().is_confirmation(current) {
            return Err(WizardError::NotAtConfirm(current));
        }

        self.flow.build_payload(&state.selections)
    }

    pub async fn submission_status(&self) -> SubmissionStatus {
        self.finalizer.status().await
    }

    pub async fn view(&self) -> WizardView {
        let state = self.state.read().await;
        let current_step = state.current_step();
        let missing_fields = self.accumulator().missing_fields(&state.selections);
        let can_submit = missing_fields.is_empty()
            && self.flow.graph().is_confirmation(current_step)
            && !self.finalizer.is_in_flight();

        WizardView {
            flow: self.flow.name().to_string(),
            current_step,
            step_history: state.step_history().to_vec(),
            selections: state.selections().clone(),
            option_sets: self.gateway.option_sets().await,
            missing_fields,
            can_submit,
            submission: self.finalizer.status().await,
        }
    }
}
