use std::sync::RwLock;

use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_utils::jwt::validate_token;

use crate::error::SessionError;

/// Capability handed to anything that needs to know who is signed in.
/// Components never read tokens from storage themselves.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn auth_token(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
struct ActiveSession {
    user: User,
    token: String,
}

/// Session whose lifecycle is driven explicitly: `init` when the shell mounts or a
/// request arrives with a fresh token, `clear` on logout.
pub struct PortalSession {
    jwt_secret: String,
    active: RwLock<Option<ActiveSession>>,
}

impl PortalSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.portal_jwt_secret.clone(),
            active: RwLock::new(None),
        }
    }

    pub fn init(&self, token: &str) -> Result<User, SessionError> {
        let user = validate_token(token, &self.jwt_secret)?;

        let mut active = self.active.write().map_err(|_| SessionError::Unavailable)?;
        let replaced = active.as_ref().is_some_and(|session| session.user.id != user.id);
        if replaced {
            info!("Session switched to user {}", user.id);
        } else {
            debug!("Session initialised for user {}", user.id);
        }

        *active = Some(ActiveSession {
            user: user.clone(),
            token: token.to_string(),
        });

        Ok(user)
    }

    pub fn clear(&self) {
        if let Ok(mut active) = self.active.write() {
            if let Some(session) = active.take() {
                info!("Session cleared for user {}", session.user.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.read().map(|active| active.is_some()).unwrap_or(false)
    }
}

impl SessionProvider for PortalSession {
    fn current_user(&self) -> Option<User> {
        self.active
            .read()
            .ok()
            .and_then(|active| active.as_ref().map(|session| session.user.clone()))
    }

    fn auth_token(&self) -> Option<String> {
        self.active
            .read()
            .ok()
            .and_then(|active| active.as_ref().map(|session| session.token.clone()))
    }
}

/// A session that never changes, for background jobs and tests.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user: User,
    token: String,
}

impl StaticSession {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<User> {
        Some(self.user.clone())
    }

    fn auth_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}
