use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use session_cell::PortalSession;
use shared_config::AppConfig;
use shared_models::auth::User;
use wizard_cell::services::WizardSession;

use crate::models::{BookingError, FlowKind};
use crate::services::backend::RestPortalBackend;

/// A wizard hosted by the shell, bound to the user who started it.
pub struct WizardEntry {
    pub id: String,
    pub owner_id: String,
    pub kind: FlowKind,
    pub wizard: Arc<WizardSession>,
    session: Arc<PortalSession>,
}

impl std::fmt::Debug for WizardEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardEntry")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl WizardEntry {
    /// Hands the latest request token to the wizard's backend.
    pub fn refresh_session(&self, token: &str) -> Result<(), BookingError> {
        self.session.init(token)?;
        Ok(())
    }
}

pub struct WizardRegistry {
    config: Arc<AppConfig>,
    wizards: RwLock<HashMap<String, Arc<WizardEntry>>>,
}

impl WizardRegistry {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            wizards: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, user: &User, token: &str, kind: FlowKind) -> Result<Arc<WizardEntry>, BookingError> {
        if !kind.permits(user.portal_role()) {
            warn!("User {} with role {:?} tried to start {}", user.id, user.role, kind);
            return Err(BookingError::NotPermitted {
                role: user.role.clone().unwrap_or_else(|| "unknown".to_string()),
                flow: kind,
            });
        }

        let session = Arc::new(PortalSession::new(&self.config));
        session.init(token)?;

        let backend = Arc::new(RestPortalBackend::new(&self.config, session.clone()));
        let wizard = Arc::new(WizardSession::new(kind.build()?, backend));

        let entry = Arc::new(WizardEntry {
            id: Uuid::new_v4().to_string(),
            owner_id: user.id.clone(),
            kind,
            wizard,
            session,
        });

        self.wizards.write().await.insert(entry.id.clone(), entry.clone());
        info!("User {} started {} wizard {}", user.id, kind, entry.id);

        Ok(entry)
    }

    /// Looks up a wizard owned by `user` and refreshes its token. Wizards owned by
    /// someone else are reported as missing.
    pub async fn get(&self, user: &User, token: &str, wizard_id: &str) -> Result<Arc<WizardEntry>, BookingError> {
        let entry = self
            .wizards
            .read()
            .await
            .get(wizard_id)
            .filter(|entry| entry.owner_id == user.id)
            .cloned()
            .ok_or(BookingError::WizardNotFound)?;

        entry.refresh_session(token)?;
        Ok(entry)
    }

    pub async fn remove(&self, user: &User, wizard_id: &str) -> Result<(), BookingError> {
        let mut wizards = self.wizards.write().await;
        match wizards.get(wizard_id) {
            Some(entry) if entry.owner_id == user.id => {
                if let Some(entry) = wizards.remove(wizard_id) {
                    entry.session.clear();
                }
                info!("User {} discarded wizard {}", user.id, wizard_id);
                Ok(())
            }
            _ => Err(BookingError::WizardNotFound),
        }
    }

    /// Drops a wizard that reached its terminal step and forgets its token.
    pub async fn evict(&self, wizard_id: &str) -> bool {
        match self.wizards.write().await.remove(wizard_id) {
            Some(entry) => {
                entry.session.clear();
                info!("{} wizard {} finished and was released", entry.kind, wizard_id);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.wizards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.wizards.read().await.is_empty()
    }
}
