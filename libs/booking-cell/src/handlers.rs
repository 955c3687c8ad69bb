use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;
use wizard_cell::models::FieldKey;

use crate::models::{
    wizard_error, CreateWizardRequest, FieldUpdateResponse, LookupOutcome, OptionsResponse,
    SetFieldRequest, WizardResponse,
};
use crate::services::registry::{WizardEntry, WizardRegistry};

fn parse_field(field: &str) -> Result<FieldKey, AppError> {
    field.parse().map_err(AppError::BadRequest)
}

async fn respond(entry: &WizardEntry) -> Json<WizardResponse> {
    Json(WizardResponse {
        wizard_id: entry.id.clone(),
        view: entry.wizard.view().await,
    })
}

// ==============================================================================
// WIZARD LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn create_wizard(
    State(registry): State<Arc<WizardRegistry>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateWizardRequest>,
) -> Result<(StatusCode, Json<WizardResponse>), AppError> {
    let entry = registry.create(&user, auth.token(), request.flow).await?;

    // First step options are needed before anything can be selected.
    let loaded = entry.wizard.refresh_step_options().await;
    debug!("Preloaded {} option sets for wizard {}", loaded.len(), entry.id);

    Ok((StatusCode::CREATED, respond(&entry).await))
}

#[axum::debug_handler]
pub async fn get_wizard(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WizardResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;
    Ok(respond(&entry).await)
}

#[axum::debug_handler]
pub async fn delete_wizard(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    registry.remove(&user, &wizard_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Wizard discarded"
    })))
}

// ==============================================================================
// SELECTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_field(
    State(registry): State<Arc<WizardRegistry>>,
    Path((wizard_id, field)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetFieldRequest>,
) -> Result<Json<FieldUpdateResponse>, AppError> {
    let key = parse_field(&field)?;
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    let cleared = match (request.option_id, request.value) {
        (Some(option_id), _) => entry.wizard.select_option(key, &option_id).await,
        (None, Some(value)) => entry.wizard.set_field(key, value).await,
        (None, None) => {
            return Err(AppError::BadRequest("Either value or option_id is required".to_string()));
        }
    }
    .map_err(wizard_error)?;

    Ok(Json(FieldUpdateResponse {
        wizard_id: entry.id.clone(),
        cleared_fields: cleared,
        view: entry.wizard.view().await,
    }))
}

#[axum::debug_handler]
pub async fn clear_field(
    State(registry): State<Arc<WizardRegistry>>,
    Path((wizard_id, field)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<FieldUpdateResponse>, AppError> {
    let key = parse_field(&field)?;
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    let cleared = entry.wizard.clear_field(key).await.map_err(wizard_error)?;

    Ok(Json(FieldUpdateResponse {
        wizard_id: entry.id.clone(),
        cleared_fields: cleared,
        view: entry.wizard.view().await,
    }))
}

// ==============================================================================
// NAVIGATION
// ==============================================================================

#[axum::debug_handler]
pub async fn advance(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WizardResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    entry.wizard.advance().await.map_err(wizard_error)?;
    entry.wizard.refresh_step_options().await;

    Ok(respond(&entry).await)
}

#[axum::debug_handler]
pub async fn retreat(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WizardResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;
    entry.wizard.retreat().await.map_err(wizard_error)?;
    Ok(respond(&entry).await)
}

#[axum::debug_handler]
pub async fn reset(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WizardResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    entry.wizard.reset().await.map_err(wizard_error)?;
    entry.wizard.refresh_step_options().await;

    Ok(respond(&entry).await)
}

#[axum::debug_handler]
pub async fn submit(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<WizardResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;
    entry.wizard.submit().await.map_err(wizard_error)?;

    let response = respond(&entry).await;
    registry.evict(&entry.id).await;
    Ok(response)
}

// ==============================================================================
// REMOTE OPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn load_options(
    State(registry): State<Arc<WizardRegistry>>,
    Path((wizard_id, field)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<OptionsResponse>, AppError> {
    let key = parse_field(&field)?;
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    let outcome = entry.wizard.load_options(key).await.map_err(wizard_error)?;

    Ok(Json(OptionsResponse {
        wizard_id: entry.id.clone(),
        outcomes: vec![LookupOutcome::new(key, outcome)],
        view: entry.wizard.view().await,
    }))
}

#[axum::debug_handler]
pub async fn refresh_options(
    State(registry): State<Arc<WizardRegistry>>,
    Path(wizard_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<OptionsResponse>, AppError> {
    let entry = registry.get(&user, auth.token(), &wizard_id).await?;

    let outcomes = entry
        .wizard
        .refresh_step_options()
        .await
        .into_iter()
        .map(|(key, outcome)| LookupOutcome::new(key, outcome))
        .collect();

    Ok(Json(OptionsResponse {
        wizard_id: entry.id.clone(),
        outcomes,
        view: entry.wizard.view().await,
    }))
}
