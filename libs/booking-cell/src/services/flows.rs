use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;

use wizard_cell::error::WizardError;
use wizard_cell::models::{
    FieldKey, FieldValue, FilterParams, ResourceType, Selections, StepDefinition, StepGraph,
    StepGraphBuilder, StepId,
};
use wizard_cell::services::WizardFlow;
use wizard_cell::validation::{parse_date, parse_slot_time};

use crate::models::{BookingPayload, FlowKind, Payment, TriagePayload, Vitals, READY_FOR_DOCTOR};

pub const DEFAULT_APPOINTMENT_TYPE: &str = "Consultation";

/// Queue status of appointments still waiting for triage.
pub const TRIAGE_QUEUE_STATUS: &str = "scheduled";

impl FlowKind {
    pub fn build(&self) -> Result<Arc<dyn WizardFlow>, WizardError> {
        let flow: Arc<dyn WizardFlow> = match self {
            FlowKind::DoctorBooking => Arc::new(DoctorBookingFlow::new()?),
            FlowKind::PatientBooking => Arc::new(PatientBookingFlow::new()?),
            FlowKind::CoordinatorTriage => Arc::new(TriageFlow::new()?),
        };
        Ok(flow)
    }
}

// ==============================================================================
// SHARED HELPERS
// ==============================================================================

fn required_text(selections: &Selections, key: FieldKey) -> Result<String, WizardError> {
    selections
        .text(key)
        .ok_or_else(|| WizardError::Incomplete { missing: vec![key] })
}

fn required_number(selections: &Selections, key: FieldKey) -> Result<f64, WizardError> {
    let value = selections
        .get(key)
        .ok_or_else(|| WizardError::Incomplete { missing: vec![key] })?;

    value.as_number().ok_or_else(|| WizardError::InvalidValue {
        field: key,
        reason: "must be a number".to_string(),
    })
}

/// Combines the selected date and slot into `YYYY-MM-DDTHH:MM:SS`.
pub fn scheduled_time(selections: &Selections) -> Result<String, WizardError> {
    let date_text = required_text(selections, FieldKey::Date)?;
    let slot_text = required_text(selections, FieldKey::Slot)?;

    let date = parse_date(&date_text).ok_or_else(|| WizardError::InvalidValue {
        field: FieldKey::Date,
        reason: format!("{} is not a date", date_text),
    })?;
    let time = parse_slot_time(&slot_text).ok_or_else(|| WizardError::InvalidValue {
        field: FieldKey::Slot,
        reason: format!("{} is not a time slot", slot_text),
    })?;

    Ok(NaiveDateTime::new(date, time)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string())
}

fn to_value<T: serde::Serialize>(payload: &T) -> Result<Value, WizardError> {
    serde_json::to_value(payload).map_err(|e| WizardError::Definition(e.to_string()))
}

/// Hospital -> doctor -> date and slot, with the lookups and invalidation edges
/// both booking flows share.
fn booking_steps(builder: StepGraphBuilder, confirm_requires: &[FieldKey]) -> StepGraphBuilder {
    builder
        .step(StepDefinition::new(StepId::SelectPrimary).requires([FieldKey::HospitalId]).then(StepId::SelectSecondary))
        .step(StepDefinition::new(StepId::SelectSecondary).requires([FieldKey::DoctorId]).then(StepId::SelectDateTime))
        .step(StepDefinition::new(StepId::SelectDateTime).requires([FieldKey::Date, FieldKey::Slot]).then(StepId::Confirm))
        .step(StepDefinition::new(StepId::Confirm).requires(confirm_requires.iter().copied()))
        .invalidates(FieldKey::HospitalId, [FieldKey::DoctorId])
        .invalidates(FieldKey::DoctorId, [FieldKey::Date])
        .invalidates(FieldKey::Date, [FieldKey::Slot])
        .lookup(FieldKey::HospitalId, StepId::SelectPrimary, ResourceType::Hospitals, Vec::<FieldKey>::new())
        .lookup(FieldKey::DoctorId, StepId::SelectSecondary, ResourceType::Doctors, [FieldKey::HospitalId])
        .lookup(FieldKey::Date, StepId::SelectDateTime, ResourceType::AvailableDates, [FieldKey::DoctorId])
        .lookup(FieldKey::Slot, StepId::SelectDateTime, ResourceType::AvailableSlots, [FieldKey::DoctorId, FieldKey::Date])
}

// ==============================================================================
// DOCTOR BOOKING
// ==============================================================================

/// A doctor books on behalf of a patient, picking the appointment type last.
pub struct DoctorBookingFlow {
    graph: StepGraph,
}

impl DoctorBookingFlow {
    pub fn new() -> Result<Self, WizardError> {
        let builder = StepGraph::builder(StepId::ChooseFlow)
            .step(StepDefinition::new(StepId::ChooseFlow).requires([FieldKey::PatientId]).then(StepId::SelectPrimary))
            .lookup(FieldKey::PatientId, StepId::ChooseFlow, ResourceType::Patients, Vec::<FieldKey>::new());

        let graph = booking_steps(builder, &[FieldKey::AppointmentType]).build(StepId::Success)?;
        Ok(Self { graph })
    }
}

impl WizardFlow for DoctorBookingFlow {
    fn name(&self) -> &'static str {
        "doctor_booking"
    }

    fn graph(&self) -> &StepGraph {
        &self.graph
    }

    fn submission_resource(&self) -> ResourceType {
        ResourceType::Appointments
    }

    fn build_payload(&self, selections: &Selections) -> Result<Value, WizardError> {
        to_value(&BookingPayload {
            patient_id: Some(required_text(selections, FieldKey::PatientId)?),
            doctor_id: required_text(selections, FieldKey::DoctorId)?,
            hospital_id: required_text(selections, FieldKey::HospitalId)?,
            scheduled_time: scheduled_time(selections)?,
            appointment_type: required_text(selections, FieldKey::AppointmentType)?,
        })
    }
}

// ==============================================================================
// PATIENT BOOKING
// ==============================================================================

pub struct PatientBookingFlow {
    graph: StepGraph,
}

impl PatientBookingFlow {
    pub fn new() -> Result<Self, WizardError> {
        let builder = StepGraph::builder(StepId::ChooseFlow)
            .step(StepDefinition::new(StepId::ChooseFlow).requires([FieldKey::AppointmentType]).then(StepId::SelectPrimary))
            .default_value(FieldKey::AppointmentType, FieldValue::text(DEFAULT_APPOINTMENT_TYPE));

        let graph = booking_steps(builder, &[]).build(StepId::Success)?;
        Ok(Self { graph })
    }
}

impl WizardFlow for PatientBookingFlow {
    fn name(&self) -> &'static str {
        "patient_booking"
    }

    fn graph(&self) -> &StepGraph {
        &self.graph
    }

    fn submission_resource(&self) -> ResourceType {
        ResourceType::Appointments
    }

    fn build_payload(&self, selections: &Selections) -> Result<Value, WizardError> {
        // The patient is whoever holds the session.
        to_value(&BookingPayload {
            patient_id: None,
            doctor_id: required_text(selections, FieldKey::DoctorId)?,
            hospital_id: required_text(selections, FieldKey::HospitalId)?,
            scheduled_time: scheduled_time(selections)?,
            appointment_type: required_text(selections, FieldKey::AppointmentType)?,
        })
    }
}

// ==============================================================================
// COORDINATOR TRIAGE
// ==============================================================================

/// Vitals and payment captured before the patient sees the doctor. Each tab owns
/// an explicit list of required fields; appointment status is never consulted.
pub struct TriageFlow {
    graph: StepGraph,
}

impl TriageFlow {
    pub fn new() -> Result<Self, WizardError> {
        let graph = StepGraph::builder(StepId::ChooseFlow)
            .step(StepDefinition::new(StepId::ChooseFlow).requires([FieldKey::HospitalId]).then(StepId::SelectPrimary))
            .step(StepDefinition::new(StepId::SelectPrimary).requires([FieldKey::AppointmentId]).then(StepId::VitalsTab))
            .step(
                StepDefinition::new(StepId::VitalsTab)
                    .requires([FieldKey::BloodPressure, FieldKey::Pulse, FieldKey::Temperature])
                    .then(StepId::PaymentTab),
            )
            .step(StepDefinition::new(StepId::PaymentTab).requires([FieldKey::PaymentAmount, FieldKey::PaymentMethod]))
            .invalidates(FieldKey::HospitalId, [FieldKey::AppointmentId])
            .invalidates(
                FieldKey::AppointmentId,
                [
                    FieldKey::BloodPressure,
                    FieldKey::Pulse,
                    FieldKey::Temperature,
                    FieldKey::Weight,
                    FieldKey::OxygenSaturation,
                    FieldKey::PaymentAmount,
                    FieldKey::PaymentMethod,
                    FieldKey::Notes,
                ],
            )
            .lookup(FieldKey::HospitalId, StepId::ChooseFlow, ResourceType::Hospitals, Vec::<FieldKey>::new())
            .lookup(FieldKey::AppointmentId, StepId::SelectPrimary, ResourceType::TriageQueue, [FieldKey::HospitalId])
            .build(StepId::ReadyForDoctor)?;

        Ok(Self { graph })
    }
}

impl WizardFlow for TriageFlow {
    fn name(&self) -> &'static str {
        "coordinator_triage"
    }

    fn graph(&self) -> &StepGraph {
        &self.graph
    }

    fn submission_resource(&self) -> ResourceType {
        ResourceType::TriageRecords
    }

    fn lookup_filter(&self, key: FieldKey) -> FilterParams {
        match key {
            FieldKey::AppointmentId => FilterParams::new().with("status", TRIAGE_QUEUE_STATUS),
            _ => FilterParams::new(),
        }
    }

    fn build_payload(&self, selections: &Selections) -> Result<Value, WizardError> {
        to_value(&TriagePayload {
            appointment_id: required_text(selections, FieldKey::AppointmentId)?,
            hospital_id: required_text(selections, FieldKey::HospitalId)?,
            vitals: Vitals {
                blood_pressure: required_text(selections, FieldKey::BloodPressure)?,
                pulse: required_number(selections, FieldKey::Pulse)?,
                temperature: required_number(selections, FieldKey::Temperature)?,
                weight: selections.number(FieldKey::Weight),
                oxygen_saturation: selections.number(FieldKey::OxygenSaturation),
            },
            payment: Payment {
                amount: required_number(selections, FieldKey::PaymentAmount)?,
                method: required_text(selections, FieldKey::PaymentMethod)?,
            },
            notes: selections.text(FieldKey::Notes),
            status: READY_FOR_DOCTOR.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_time_joins_date_and_slot() {
        let flow = PatientBookingFlow::new().expect("flow");
        let mut selections = Selections::default();
        assert_eq!(
            scheduled_time(&selections),
            Err(WizardError::Incomplete {
                missing: vec![FieldKey::Date],
            })
        );

        let session_graph = flow.graph();
        assert_eq!(session_graph.initial(), StepId::ChooseFlow);

        // Selections are only writable through the engine, so drive it directly.
        let accumulator = wizard_cell::services::SelectionAccumulator::new(session_graph);
        accumulator
            .set_field(&mut selections, FieldKey::Date, FieldValue::text("2024-06-10"))
            .expect("date");
        accumulator
            .set_field(&mut selections, FieldKey::Slot, FieldValue::text("02:30 PM"))
            .expect("slot");

        assert_eq!(scheduled_time(&selections).as_deref(), Ok("2024-06-10T14:30:00"));
    }

    #[test]
    fn test_every_flow_builds() {
        for kind in [FlowKind::DoctorBooking, FlowKind::PatientBooking, FlowKind::CoordinatorTriage] {
            let flow = kind.build().expect("flow builds");
            assert_eq!(flow.name(), kind.to_string());
        }
    }

    #[test]
    fn test_hospital_change_cascades_through_booking_fields() {
        let flow = DoctorBookingFlow::new().expect("flow");
        assert_eq!(
            flow.graph().derived_from(FieldKey::HospitalId),
            vec![FieldKey::DoctorId, FieldKey::Date, FieldKey::Slot]
        );
        assert_eq!(flow.graph().derived_from(FieldKey::PatientId), Vec::<FieldKey>::new());
    }

    #[test]
    fn test_triage_queue_lookup_is_filtered_by_status() {
        let flow = TriageFlow::new().expect("flow");
        assert_eq!(
            flow.lookup_filter(FieldKey::AppointmentId).get("status"),
            Some(TRIAGE_QUEUE_STATUS)
        );
        assert!(flow.lookup_filter(FieldKey::HospitalId).is_empty());
    }
}
