use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{MoveRequest, PreferencesResponse};
use crate::services::PreferencesService;

#[axum::debug_handler]
pub async fn get_hospital_preferences(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<PreferencesResponse>, AppError> {
    debug!("Fetching hospital preferences for user {}", user.id);
    let service = PreferencesService::new(&config);

    let preferences = service.hospital_preferences(auth.token()).await?;

    Ok(Json(PreferencesResponse::from(&preferences)))
}

#[axum::debug_handler]
pub async fn move_hospital_preference(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<PreferencesResponse>, AppError> {
    debug!(
        "User {} moving hospital preference {} -> {}",
        user.id, request.from, request.to
    );
    let service = PreferencesService::new(&config);

    let preferences = service
        .move_hospital(request.from, request.to, auth.token())
        .await?;

    Ok(Json(PreferencesResponse::from(&preferences)))
}
