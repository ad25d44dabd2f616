use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::assessment::{
    Assessment, AssessmentResponse, AssessmentUpdate, NewAssessment,
};
use coachpro_core::db;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AssessmentsQuery {
    #[serde(default)]
    pub program_id: Option<i64>,
}

/// GET /api/coachpro/v1/assessments?program_id=
pub async fn list_assessments(
    State(app): State<AppState>,
    _who: Identity,
    Query(q): Query<AssessmentsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let program_id = q.program_id.filter(|id| *id > 0);
    let rows = app.with_store(move |s| s.list_assessments(program_id)).await?;
    Ok(super::items(rows))
}

/// GET /api/coachpro/v1/assessments/{id}
pub async fn get_assessment(
    State(app): State<AppState>,
    _who: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Assessment>, AppError> {
    let a = app.with_store(move |s| s.load_assessment(id)).await?;
    Ok(Json(a))
}

/// POST /api/coachpro/v1/assessments
pub async fn create_assessment(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<NewAssessment>,
) -> Result<(StatusCode, Json<Assessment>), AppError> {
    who.require(Capability::Edit)?;
    let a = app
        .with_store(move |s| s.create_assessment(input, db::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(a)))
}

/// PUT /api/coachpro/v1/assessments/{id}
pub async fn update_assessment(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
    Json(update): Json<AssessmentUpdate>,
) -> Result<Json<Assessment>, AppError> {
    who.require(Capability::Edit)?;
    let a = app
        .with_store(move |s| s.update_assessment(id, update, db::now()))
        .await?;
    Ok(Json(a))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(default)]
    pub answers: serde_json::Value,
}

/// POST /api/coachpro/v1/assessments/{id}/responses: the caller's answers.
pub async fn submit_response(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<AssessmentResponse>), AppError> {
    let student_id = who.id();
    let r = app
        .with_store(move |s| s.submit_response(id, student_id, &body.answers, db::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(r)))
}

/// GET /api/coachpro/v1/assessments/{id}/responses: all with view, else own.
pub async fn list_responses(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let only = if who.can(Capability::View) {
        None
    } else {
        Some(who.id())
    };
    let rows = app.with_store(move |s| s.list_responses(id, only)).await?;
    Ok(super::items(rows))
}

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
    pub score: f64,
}

/// PUT /api/coachpro/v1/responses/{id}/score
pub async fn grade_response(
    State(app): State<AppState>,
    who: Identity,
    Path(id): Path<i64>,
    Json(body): Json<ScoreBody>,
) -> Result<Json<AssessmentResponse>, AppError> {
    who.require(Capability::Edit)?;
    let r = app
        .with_store(move |s| s.grade_response(id, body.score))
        .await?;
    Ok(Json(r))
}
