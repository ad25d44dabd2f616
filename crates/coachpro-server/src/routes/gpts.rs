use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::db;
use coachpro_core::gpt::{CustomGpt, GptInput, RenderedPrompt};
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/coachpro/v1/gpts: public catalogue.
pub async fn list_public(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let gpts = app.with_store(|s| s.list_gpts()).await?;
    let list: Vec<_> = gpts
        .iter()
        .map(|g| {
            serde_json::json!({
                "id": g.id,
                "name": g.name,
                "description": g.description,
                "prompt_fields": g.prompt_fields,
            })
        })
        .collect();
    Ok(super::items(list))
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptBody {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// POST /api/coachpro/v1/gpts/{id}/prompt: fill the prompt template.
pub async fn build_prompt(
    State(app): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PromptBody>,
) -> Result<Json<RenderedPrompt>, AppError> {
    let rendered = app
        .with_store(move |s| s.load_gpt(id)?.render_prompt(&body.values))
        .await?;
    Ok(Json(rendered))
}

/// GET /api/coachpro/v1/admin/gpts
pub async fn admin_list(
    State(app): State<AppState>,
    who: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::Manage)?;
    let gpts = app.with_store(|s| s.list_gpts()).await?;
    Ok(super::items(gpts))
}

/// GET /api/coachpro/v1/admin/gpts/{id}
pub async fn admin_get(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
) -> Result<Json<CustomGpt>, AppError> {
    who.require(Capability::Manage)?;
    let gpt = app.with_store(move |s| s.load_gpt(id)).await?;
    Ok(Json(gpt))
}

/// POST /api/coachpro/v1/admin/gpts
pub async fn admin_create(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<GptInput>,
) -> Result<(StatusCode, Json<CustomGpt>), AppError> {
    who.require(Capability::Manage)?;
    let gpt = app.with_store(move |s| s.create_gpt(input, db::now())).await?;
    Ok((StatusCode::CREATED, Json(gpt)))
}

/// PUT /api/coachpro/v1/admin/gpts/{id}
pub async fn admin_update(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
    Json(input): Json<GptInput>,
) -> Result<Json<CustomGpt>, AppError> {
    who.require(Capability::Manage)?;
    let gpt = app
        .with_store(move |s| s.update_gpt(id, input, db::now()))
        .await?;
    Ok(Json(gpt))
}

/// DELETE /api/coachpro/v1/admin/gpts/{id}
pub async fn admin_delete(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    who.require(Capability::Manage)?;
    app.with_store(move |s| s.delete_gpt(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
