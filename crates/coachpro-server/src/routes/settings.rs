use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use coachpro_core::settings::{Settings, SettingsUpdate};
use coachpro_core::types::Capability;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/coachpro/v1/settings
pub async fn get_settings(
    State(app): State<AppState>,
    who: Identity,
) -> Result<Json<Settings>, AppError> {
    who.require(Capability::Manage)?;
    let settings = app.with_store(|s| s.load_settings()).await?;
    Ok(Json(settings))
}

/// PUT|POST /api/coachpro/v1/settings: partial update.
pub async fn save_settings(
    State(app): State<AppState>,
    who: Identity,
    body: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::Manage)?;
    let Json(update) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let settings = app.with_store(move |s| s.apply_settings(update)).await?;
    Ok(Json(serde_json::json!({
        "message": "Settings saved.",
        "settings": settings,
    })))
}
