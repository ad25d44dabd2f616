use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::program::{Program, ProgramInput};
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProgramsQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/coachpro/v1/programs: published programs, newest first.
pub async fn list_programs(
    State(app): State<AppState>,
    Query(q): Query<ProgramsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let base = app.config.site.base_url().to_string();
    let programs = app
        .with_store(move |s| s.list_published_programs(q.category.as_deref()))
        .await?;
    let list: Vec<_> = programs.iter().map(|p| p.summary(&base)).collect();
    Ok(super::items(list))
}

/// POST /api/coachpro/v1/programs
pub async fn create_program(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<ProgramInput>,
) -> Result<(StatusCode, Json<Program>), AppError> {
    who.require(Capability::Edit)?;
    let program = app.with_store(move |s| s.create_program(input)).await?;
    tracing::info!(id = program.id, slug = %program.slug, "program created");
    Ok((StatusCode::CREATED, Json(program)))
}

/// PUT /api/coachpro/v1/programs/{id}
pub async fn update_program(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
    Json(input): Json<ProgramInput>,
) -> Result<Json<Program>, AppError> {
    who.require(Capability::Edit)?;
    let program = app.with_store(move |s| s.update_program(id, input)).await?;
    Ok(Json(program))
}
