use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::models::{ConfirmationRecord, FilterParams, ResourceType, WizardOption};

/// The remote data boundary a wizard talks to. Implementations live next to the
/// transport they use; the engine only sees this contract.
#[async_trait]
pub trait PortalBackend: Send + Sync {
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
