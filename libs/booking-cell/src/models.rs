// libs/booking-cell/src/models.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use session_cell::SessionError;
use shared_models::auth::PortalRole;
use shared_models::error::AppError;
use wizard_cell::error::WizardError;
use wizard_cell::models::{FieldKey, FieldValue, WizardView};
use wizard_cell::services::FetchOutcome;

// ==============================================================================
// FLOWS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    DoctorBooking,
    PatientBooking,
    CoordinatorTriage,
}

impl FlowKind {
    /// Roles allowed to start this flow.
    pub fn allowed_roles(&self) -> &'static [PortalRole] {
        match self {
            FlowKind::DoctorBooking => &[PortalRole::Doctor, PortalRole::Admin],
            FlowKind::PatientBooking => &[PortalRole::Patient],
            FlowKind::CoordinatorTriage => &[PortalRole::Coordinator, PortalRole::Admin],
        }
    }

    pub fn permits(&self, role: Option<PortalRole>) -> bool {
        role.is_some_and(|role| self.allowed_roles().contains(&role))
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::DoctorBooking => write!(f, "doctor_booking"),
            FlowKind::PatientBooking => write!(f, "patient_booking"),
            FlowKind::CoordinatorTriage => write!(f, "coordinator_triage"),
        }
    }
}

// ==============================================================================
// SUBMISSION PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub doctor_id: String,
    pub hospital_id: String,
    pub scheduled_time: String,
    pub appointment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub blood_pressure: String,
    pub pulse: f64,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: f64,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriagePayload {
    pub appointment_id: String,
    pub hospital_id: String,
    pub vitals: Vitals,
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: String,
}

/// Appointment status the triage record moves the patient into.
pub const READY_FOR_DOCTOR: &str = "ready_for_doctor";

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWizardRequest {
    pub flow: FlowKind,
}

/// Either a literal value or the id of an option from the loaded option set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetFieldRequest {
    pub value: Option<FieldValue>,
    pub option_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardResponse {
    pub wizard_id: String,
    #[serde(flatten)]
    pub view: WizardView,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldUpdateResponse {
    pub wizard_id: String,
    pub cleared_fields: Vec<FieldKey>,
    #[serde(flatten)]
    pub view: WizardView,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionsResponse {
    pub wizard_id: String,
    pub outcomes: Vec<LookupOutcome>,
    #[serde(flatten)]
    pub view: WizardView,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub field: FieldKey,
    pub outcome: String,
}

impl LookupOutcome {
    pub fn new(field: FieldKey, outcome: FetchOutcome) -> Self {
        let outcome = match outcome {
            FetchOutcome::Applied { .. } => "applied",
            FetchOutcome::Failed => "failed",
            FetchOutcome::Discarded => "discarded",
        };

        Self {
            field,
            outcome: outcome.to_string(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Wizard not found")]
    WizardNotFound,

    #[error("Role {role} cannot start the {flow} flow")]
    NotPermitted { role: String, flow: FlowKind },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// HTTP rendering of engine errors.
pub fn wizard_error(error: WizardError) -> AppError {
    match error {
        WizardError::Validation { .. }
        | WizardError::InvalidValue { .. }
        | WizardError::Incomplete { .. }
        | WizardError::MissingDependency { .. } => AppError::ValidationError(error.to_string()),
        WizardError::NoNextStep(_)
        | WizardError::NotAtConfirm(_)
        | WizardError::Finished(_)
        | WizardError::SubmissionInFlight => {
            AppError::Conflict(error.to_string())
        }
        WizardError::UnknownLookup(_) => AppError::BadRequest(error.to_string()),
        // Shown to the user as-is.
        WizardError::Submission(message) => AppError::ExternalService(message),
        WizardError::UnknownStep(_) | WizardError::Definition(_) => AppError::Internal(error.to_string()),
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::WizardNotFound => AppError::NotFound(error.to_string()),
            BookingError::NotPermitted { .. } => AppError::Forbidden(error.to_string()),
            BookingError::Session(e) => AppError::Auth(e.to_string()),
            BookingError::Wizard(e) => wizard_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wizard_cell::models::StepId;

    #[test]
    fn test_flow_role_gating() {
        assert!(FlowKind::DoctorBooking.permits(Some(PortalRole::Doctor)));
        assert!(FlowKind::DoctorBooking.permits(Some(PortalRole::Admin)));
        assert!(!FlowKind::DoctorBooking.permits(Some(PortalRole::Patient)));
        assert!(FlowKind::PatientBooking.permits(Some(PortalRole::Patient)));
        assert!(!FlowKind::PatientBooking.permits(Some(PortalRole::Admin)));
        assert!(FlowKind::CoordinatorTriage.permits(Some(PortalRole::Coordinator)));
        assert!(!FlowKind::CoordinatorTriage.permits(None));
    }

    #[test]
    fn test_booking_payload_omits_missing_patient() {
        let payload = BookingPayload {
            patient_id: None,
            doctor_id: "doc-smith".to_string(),
            hospital_id: "hosp-city".to_string(),
            scheduled_time: "2024-06-10T10:00:00".to_string(),
            appointment_type: "Consultation".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "doctorId": "doc-smith",
                "hospitalId": "hosp-city",
                "scheduledTime": "2024-06-10T10:00:00",
                "appointmentType": "Consultation"
            })
        );
    }

    #[test]
    fn test_wizard_errors_map_to_http_errors() {
        let conflict = wizard_error(WizardError::SubmissionInFlight);
        assert_eq!(conflict.status_code(), axum::http::StatusCode::CONFLICT);

        let early = wizard_error(WizardError::NotAtConfirm(StepId::SelectPrimary));
        assert_eq!(early.status_code(), axum::http::StatusCode::CONFLICT);

        let upstream = wizard_error(WizardError::Submission("Slot no longer available".to_string()));
        assert_eq!(upstream.message(), "Slot no longer available");

        let forbidden = AppError::from(BookingError::NotPermitted {
            role: "patient".to_string(),
            flow: FlowKind::CoordinatorTriage,
        });
        assert_eq!(forbidden.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
