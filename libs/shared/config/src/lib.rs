use std::env;
use tracing::warn;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BIND_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub portal_api_url: String,
    pub portal_api_key: String,
    pub portal_jwt_secret: String,
    pub request_timeout_secs: u64,
    pub bind_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            portal_api_url: env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_URL not set, using empty value");
                    String::new()
                }),
            portal_api_key: env::var("PORTAL_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_KEY not set, using empty value");
                    String::new()
                }),
            portal_jwt_secret: env::var("PORTAL_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            request_timeout_secs: env::var("PORTAL_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORTAL_REQUEST_TIMEOUT_SECS not set or invalid, using default");
                    DEFAULT_REQUEST_TIMEOUT_SECS
                }),
            bind_port: env::var("PORTAL_BIND_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_BIND_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.portal_api_url.is_empty()
            && !self.portal_api_key.is_empty()
            && !self.portal_jwt_secret.is_empty()
    }
}
