use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{BackendError, WizardError, GENERIC_SUBMISSION_FAILURE};
use crate::models::{ConfirmationRecord, SubmissionStatus};

/// Guards the single create request a wizard ends with. While a request is in
/// flight every further attempt is refused without touching the backend.
pub struct SubmissionFinalizer {
    in_flight: AtomicBool,
    status: RwLock<SubmissionStatus>,
}

impl Default for SubmissionFinalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionFinalizer {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            status: RwLock::new(SubmissionStatus::Idle),
        }
    }

    /// Claims the guard. Returns `false` if another submission holds it.
    pub fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn mark_in_flight(&self) {
        *self.status.write().await = SubmissionStatus::InFlight;
    }

    /// Records the outcome. The guard stays claimed until [`release`](Self::release)
    /// so the caller can finish its own bookkeeping first.
    pub async fn record(
        &self,
        result: Result<ConfirmationRecord, BackendError>,
    ) -> Result<ConfirmationRecord, WizardError> {
        match result {
            Ok(record) => {
                info!("Submission confirmed with id {}", record.id);
                *self.status.write().await = SubmissionStatus::Succeeded {
                    confirmation: record.clone(),
                };
                Ok(record)
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                let message = e
                    .user_message()
                    .unwrap_or(GENERIC_SUBMISSION_FAILURE)
                    .to_string();
                *self.status.write().await = SubmissionStatus::Failed {
                    message: message.clone(),
                };
                Err(WizardError::Submission(message))
            }
        }
    }

    pub fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub async fn status(&self) -> SubmissionStatus {
        self.status.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.status.write().await = SubmissionStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_guard_is_exclusive() {
        let finalizer = SubmissionFinalizer::new();

        assert!(finalizer.try_begin());
        assert!(!finalizer.try_begin());
        finalizer.release();
        assert!(finalizer.try_begin());
    }

    #[tokio::test]
    async fn test_failure_uses_server_message_then_fallback() {
        let finalizer = SubmissionFinalizer::new();

        assert!(finalizer.try_begin());
        let result = finalizer
            .record(Err(BackendError::Api {
                status: 409,
                message: Some("Slot no longer available".to_string()),
            }))
            .await;
        assert_eq!(result, Err(WizardError::Submission("Slot no longer available".to_string())));
        assert!(finalizer.is_in_flight());
        finalizer.release();

        assert!(finalizer.try_begin());
        let result = finalizer
            .record(Err(BackendError::Transport("timed out".to_string())))
            .await;
        assert_eq!(result, Err(WizardError::Submission(GENERIC_SUBMISSION_FAILURE.to_string())));
        assert_matches!(finalizer.status().await, SubmissionStatus::Failed { .. });
    }
}
