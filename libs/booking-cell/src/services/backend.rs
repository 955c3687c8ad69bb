use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use session_cell::SessionProvider;
use shared_backend::{ApiError, PortalApiClient};
use shared_config::AppConfig;
use wizard_cell::error::BackendError;
use wizard_cell::models::{ConfirmationRecord, FilterParams, ResourceType, WizardOption};
use wizard_cell::services::PortalBackend;

use crate::services::normalize;

pub fn resource_path(resource: ResourceType) -> &'static str {
    match resource {
        ResourceType::Patients => "/api/patients",
        ResourceType::Hospitals => "/api/hospitals",
        ResourceType::Doctors => "/api/doctors",
        ResourceType::AvailableDates => "/api/availability/dates",
        ResourceType::AvailableSlots => "/api/availability/slots",
        ResourceType::TriageQueue => "/api/appointments/queue",
        ResourceType::Appointments => "/api/appointments",
        ResourceType::TriageRecords => "/api/triage",
    }
}

/// `?a=1&b=2` with every name and value URL-encoded; empty when there is no filter.
pub fn query_string(filter: &FilterParams) -> String {
    if filter.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = filter
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect();

    format!("?{}", pairs.join("&"))
}

pub fn backend_error(error: ApiError) -> BackendError {
    match error {
        ApiError::Status { status: 401, message } => {
            BackendError::Auth(message.unwrap_or_else(|| "Unauthorized".to_string()))
        }
        ApiError::Status { status, message } => BackendError::Api { status, message },
        ApiError::Decode(e) => BackendError::Decode(e.to_string()),
        ApiError::Transport(e) => BackendError::Transport(e.to_string()),
        ApiError::InvalidHeader(e) => BackendError::Transport(e),
    }
}

/// `PortalBackend` over the portal REST API. The bearer token is read from the
/// session provider on every call, so a refreshed session is picked up at once.
pub struct RestPortalBackend {
    client: PortalApiClient,
    session: Arc<dyn SessionProvider>,
}

impl RestPortalBackend {
    pub fn new(config: &AppConfig, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            client: PortalApiClient::new(config),
            session,
        }
    }

    fn token(&self) -> Result<String, BackendError> {
        self.session.auth_token().ok_or_else(|| {
            warn!("Backend call attempted without an active session");
            BackendError::Auth("No active session".to_string())
        })
    }
}

#[async_trait]
impl PortalBackend for RestPortalBackend {
    async fn list_options(
        &self,
        resource: ResourceType,
        filter: &FilterParams,
    ) -> Result<Vec<WizardOption>, BackendError> {
        let token = self.token()?;
        let path = format!("{}{}", resource_path(resource), query_string(filter));

        let body: Value = self
            .client
            .get(&path, Some(&token))
            .await
            .map_err(backend_error)?;

        let options = normalize::options_for(resource, body)?;
        debug!("Loaded {} {} options", options.len(), resource);
        Ok(options)
    }

    async fn create_resource(
        &self,
        resource: ResourceType,
        payload: Value,
    ) -> Result<ConfirmationRecord, BackendError> {
        let token = self.token()?;

        let body: Value = self
            .client
            .post(resource_path(resource), Some(&token), payload)
            .await
            .map_err(backend_error)?;

        normalize::confirmation(resource, body)
    }
}
