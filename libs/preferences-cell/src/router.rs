use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn preference_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/hospitals", get(get_hospital_preferences))
        .route("/hospitals/move", post(move_hospital_preference))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
