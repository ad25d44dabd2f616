use axum::extract::{Path, State};
use axum::Json;
use coachpro_core::db;
use coachpro_core::progress::Progress;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
    pub lessons_total: i64,
    pub lessons_done: i64,
    #[serde(default)]
    pub avg_score: f64,
}

/// PUT /api/coachpro/v1/progress/{student_id}/{program_id}
pub async fn update_progress(
    State(app): State<AppState>,
    who: Identity,
    Path((student_id, program_id)): Path<(i64, i64)>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<Progress>, AppError> {
    who.require(Capability::Edit)?;
    let progress = app
        .with_store(move |s| {
            s.update_progress(
                student_id,
                program_id,
                body.lessons_total,
                body.lessons_done,
                body.avg_score,
                db::now(),
            )
        })
        .await?;
    Ok(Json(progress))
}
