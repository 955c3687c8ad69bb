use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::wizard_routes;
use preferences_cell::router::preference_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Care Portal API is running!" }))
        .nest("/wizards", wizard_routes(state.clone()))
        .nest("/preferences", preference_routes(state))
}
