use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::db;
use coachpro_core::recommendation::Recommendation;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsQuery {
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub program_id: Option<i64>,
}

/// GET /api/coachpro/v1/recommendations: own rows, or anyone's with view.
pub async fn list_recommendations(
    State(app): State<AppState>,
    who: Identity,
    Query(q): Query<RecommendationsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let student_id = q.student_id.unwrap_or(who.id());
    who.require_self_or(student_id, Capability::View)?;
    let program_id = q.program_id.filter(|id| *id > 0);
    let rows = app
        .with_store(move |s| s.list_recommendations(student_id, program_id))
        .await?;
    Ok(super::items(rows))
}

#[derive(Debug, Deserialize)]
pub struct NewRecommendation {
    pub student_id: i64,
    pub program_id: i64,
    #[serde(default)]
    pub rule: serde_json::Value,
    #[serde(default)]
    pub output: serde_json::Value,
}

/// POST /api/coachpro/v1/recommendations
pub async fn create_recommendation(
    State(app): State<AppState>,
    who: Identity,
    Json(body): Json<NewRecommendation>,
) -> Result<(StatusCode, Json<Recommendation>), AppError> {
    who.require(Capability::Edit)?;
    let rec = app
        .with_store(move |s| {
            s.create_recommendation(
                body.student_id,
                body.program_id,
                &body.rule,
                &body.output,
                db::now(),
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(rec)))
}
