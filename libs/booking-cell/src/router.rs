use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::registry::WizardRegistry;

pub fn wizard_routes(config: Arc<AppConfig>) -> Router {
    let registry = Arc::new(WizardRegistry::new(config.clone()));

    Router::new()
        .route("/", post(handlers::create_wizard))
        .route("/{wizard_id}", get(handlers::get_wizard).delete(handlers::delete_wizard))
        .route(
            "/{wizard_id}/fields/{field}",
            put(handlers::set_field).delete(handlers::clear_field),
        )
        .route("/{wizard_id}/advance", post(handlers::advance))
        .route("/{wizard_id}/retreat", post(handlers::retreat))
        .route("/{wizard_id}/reset", post(handlers::reset))
        .route("/{wizard_id}/submit", post(handlers::submit))
        .route("/{wizard_id}/options", post(handlers::refresh_options))
        .route("/{wizard_id}/options/{field}", post(handlers::load_options))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(registry)
}
