use axum::extract::{Path, State};
use axum::Json;
use coachpro_core::db;
use coachpro_core::profile::ProfileInput;
use coachpro_core::types::Capability;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/coachpro/v1/profiles/me: `{"profile": null}` until one is saved.
pub async fn get_my_profile(
    State(app): State<AppState>,
    who: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = who.id();
    let profile = app.with_store(move |s| s.get_profile(user_id)).await?;
    Ok(Json(serde_json::json!({ "profile": profile })))
}

/// PUT /api/coachpro/v1/profiles/me
pub async fn put_my_profile(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<ProfileInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = who.id();
    let profile = app
        .with_store(move |s| s.upsert_profile(user_id, input, db::now()))
        .await?;
    Ok(Json(serde_json::json!({ "profile": profile })))
}

/// GET /api/coachpro/v1/profiles/{user_id}
pub async fn get_profile(
    State(app): State<AppState>,
    who: Identity,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require_self_or(user_id, Capability::View)?;
    let profile = app.with_store(move |s| s.get_profile(user_id)).await?;
    Ok(Json(serde_json::json!({ "profile": profile })))
}
