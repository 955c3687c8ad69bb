use thiserror::Error;

use crate::models::{FetchFailure, FieldKey, StepId};

/// Shown when the backend rejects a submission without saying why.
pub const GENERIC_SUBMISSION_FAILURE: &str = "We could not complete your request. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("Validation error on step {step}: missing {missing:?}")]
    Validation { step: StepId, missing: Vec<FieldKey> },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: FieldKey, reason: String },

    #[error("Step {0} is not part of this flow")]
    UnknownStep(StepId),

    #[error("Step {0} is completed by submitting, not by advancing")]
    NoNextStep(StepId),

    #[error("Wizard already finished at step {0}")]
    Finished(StepId),

    #[error("Submission is only possible from the confirmation step, not from {0}")]
    NotAtConfirm(StepId),

    #[error("Submission is disabled until every required field is filled: missing {missing:?}")]
    Incomplete { missing: Vec<FieldKey> },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("{0}")]
    Submission(String),

    #[error("No lookup is defined for {0}")]
    UnknownLookup(FieldKey),

    #[error("Cannot load {key} before {missing:?} are selected")]
    MissingDependency { key: FieldKey, missing: Vec<FieldKey> },

    #[error("Flow definition error: {0}")]
    Definition(String),
}

impl WizardError {
    /// Errors the user fixes by editing the form, as opposed to retrying.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            WizardError::Validation { .. }
                | WizardError::InvalidValue { .. }
                | WizardError::Incomplete { .. }
                | WizardError::MissingDependency { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Api { status: u16, message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl BackendError {
    /// The server's own wording, when it sent any.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            BackendError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Auth(_) => Some(401),
            _ => None,
        }
    }
}

impl From<&BackendError> for FetchFailure {
    fn from(error: &BackendError) -> Self {
        let message = match error {
            BackendError::Api { message: Some(message), .. } => message.clone(),
            BackendError::Auth(_) => "Your session has expired. Please sign in again.".to_string(),
            _ => "Could not load options. Please retry.".to_string(),
        };

        FetchFailure {
            message,
            status: error.status(),
        }
    }
}
