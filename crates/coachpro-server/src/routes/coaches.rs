use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::coach::{Coach, CoachInput};
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CoachesQuery {
    #[serde(default)]
    pub specialty: Option<String>,
}

/// GET /api/coachpro/v1/coaches: published coaches, optional text search.
pub async fn list_coaches(
    State(app): State<AppState>,
    Query(q): Query<CoachesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let base = app.config.site.base_url().to_string();
    let coaches = app
        .with_store(move |s| s.list_published_coaches(q.specialty.as_deref()))
        .await?;
    let list: Vec<_> = coaches.iter().map(|c| c.summary(&base)).collect();
    Ok(super::items(list))
}

/// POST /api/coachpro/v1/coaches
pub async fn create_coach(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<CoachInput>,
) -> Result<(StatusCode, Json<Coach>), AppError> {
    who.require(Capability::Edit)?;
    let coach = app.with_store(move |s| s.create_coach(input)).await?;
    Ok((StatusCode::CREATED, Json(coach)))
}
