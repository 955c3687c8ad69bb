#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use wizard_cell::error::{BackendError, WizardError};
use wizard_cell::models::{
    ConfirmationRecord, FieldKey, FieldValue, FilterParams, ResourceType, Selections, StepDefinition,
    StepGraph, StepId, WizardOption,
};
use wizard_cell::services::{PortalBackend, WizardFlow};

// ==============================================================================
// FLOW UNDER TEST
// ==============================================================================

/// Hospital -> doctor -> date and slot -> confirm.
pub struct ClinicBookingFlow {
    graph: StepGraph,
}

impl ClinicBookingFlow {
    pub fn new() -> Self {
        let graph = StepGraph::builder(StepId::SelectPrimary)
            .step(StepDefinition::new(StepId::SelectPrimary).requires([FieldKey::HospitalId]).then(StepId::SelectSecondary))
            .step(StepDefinition::new(StepId::SelectSecondary).requires([FieldKey::DoctorId]).then(StepId::SelectDateTime))
            .step(StepDefinition::new(StepId::SelectDateTime).requires([FieldKey::Date, FieldKey::Slot]).then(StepId::Confirm))
            .step(StepDefinition::new(StepId::Confirm))
            .invalidates(FieldKey::HospitalId, [FieldKey::DoctorId, FieldKey::Date, FieldKey::Slot])
            .invalidates(FieldKey::DoctorId, [FieldKey::Date, FieldKey::Slot])
            .invalidates(FieldKey::Date, [FieldKey::Slot])
            .lookup(FieldKey::HospitalId, StepId::SelectPrimary, ResourceType::Hospitals, Vec::<FieldKey>::new())
            .lookup(FieldKey::DoctorId, StepId::SelectSecondary, ResourceType::Doctors, [FieldKey::HospitalId])
            .lookup(FieldKey::Date, StepId::SelectDateTime, ResourceType::AvailableDates, [FieldKey::DoctorId])
            .lookup(FieldKey::Slot, StepId::SelectDateTime, ResourceType::AvailableSlots, [FieldKey::DoctorId, FieldKey::Date])
            .build(StepId::Success)
            .expect("valid graph");

        Self { graph }
    }
}

impl WizardFlow for ClinicBookingFlow {
    fn name(&self) -> &'static str {
        "clinic_booking"
    }

    fn graph(&self) -> &StepGraph {
        &self.graph
    }

    fn submission_resource(&self) -> ResourceType {
        ResourceType::Appointments
    }

    fn build_payload(&self, selections: &Selections) -> Result<Value, WizardError> {
        Ok(json!({
            "hospitalId": selections.text(FieldKey::HospitalId),
            "doctorId": selections.text(FieldKey::DoctorId),
            "date": selections.text(FieldKey::Date),
            "slot": selections.text(FieldKey::Slot),
        }))
    }
}

pub fn choice(id: &str) -> FieldValue {
    FieldValue::Choice(WizardOption::new(id, id))
}

pub fn confirmation(id: &str) -> ConfirmationRecord {
    ConfirmationRecord {
        id: id.to_string(),
        summary_fields: serde_json::Map::new(),
    }
}

// ==============================================================================
// BACKENDS
// ==============================================================================

mock! {
    pub Backend {}

    #[async_trait]
    impl PortalBackend for Backend {
        async fn list_options(
            &self,
            resource: ResourceType,
            filter: &FilterParams,
        ) -> Result<Vec<WizardOption>, BackendError>;

        async fn create_resource(
            &self,
            resource: ResourceType,
            payload: Value,
        ) -> Result<ConfirmationRecord, BackendError>;
    }
}

/// A backend call parked until the test answers it.
pub enum PendingCall {
    List {
        resource: ResourceType,
        filter: FilterParams,
        reply: oneshot::Sender<Result<Vec<WizardOption>, BackendError>>,
    },
    Create {
        resource: ResourceType,
        payload: Value,
        reply: oneshot::Sender<Result<ConfirmationRecord, BackendError>>,
    },
}

/// Lets a test decide when, and in which order, backend responses arrive.
pub struct ScriptedBackend {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl ScriptedBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, receiver) = mpsc::unbounded_channel();
        (Self { calls }, receiver)
    }
}

fn closed() -> BackendError {
    BackendError::Transport("test harness dropped the call".to_string())
}

#[async_trait]
impl PortalBackend for ScriptedBackend {
    async fn list_options(
        &self,
        resource: ResourceType,
        filter: &FilterParams,
    ) -> Result<Vec<WizardOption>, BackendError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(PendingCall::List {
                resource,
                filter: filter.clone(),
                reply,
            })
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }

    async fn create_resource(
        &self,
        resource: ResourceType,
        payload: Value,
    ) -> Result<ConfirmationRecord, BackendError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(PendingCall::Create {
                resource,
                payload,
                reply,
            })
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }
}

pub async fn next_list(
    calls: &mut mpsc::UnboundedReceiver<PendingCall>,
) -> (ResourceType, FilterParams, oneshot::Sender<Result<Vec<WizardOption>, BackendError>>) {
    match calls.recv().await {
        Some(PendingCall::List { resource, filter, reply }) => (resource, filter, reply),
        Some(PendingCall::Create { .. }) => panic!("expected a list call, got a create call"),
        None => panic!("backend channel closed"),
    }
}

pub async fn next_create(
    calls: &mut mpsc::UnboundedReceiver<PendingCall>,
) -> (ResourceType, Value, oneshot::Sender<Result<ConfirmationRecord, BackendError>>) {
    match calls.recv().await {
        Some(PendingCall::Create { resource, payload, reply }) => (resource, payload, reply),
        Some(PendingCall::List { .. }) => panic!("expected a create call, got a list call"),
        None => panic!("backend channel closed"),
    }
}
