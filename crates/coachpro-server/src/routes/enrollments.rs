use axum::extract::{Path, Query, State};
use axum::Json;
use coachpro_core::db;
use coachpro_core::enrollment::Enrollment;
use coachpro_core::error::CoachError;
use coachpro_core::types::{Capability, EnrollmentStatus};
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentsQuery {
    #[serde(default)]
    pub program_id: Option<i64>,
}

/// GET /api/coachpro/v1/enrollments?program_id=
pub async fn list_for_program(
    State(app): State<AppState>,
    who: Identity,
    Query(q): Query<EnrollmentsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::View)?;
    let program_id = q
        .program_id
        .filter(|id| *id > 0)
        .ok_or_else(|| CoachError::MissingField("Program required.".into()))?;
    let rows = app
        .with_store(move |s| s.list_enrollments_for_program(program_id))
        .await?;
    Ok(super::items(rows))
}

/// GET /api/coachpro/v1/enrollments/me
pub async fn list_mine(
    State(app): State<AppState>,
    who: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let student_id = who.id();
    let rows = app
        .with_store(move |s| s.list_enrollments_for_student(student_id))
        .await?;
    Ok(super::items(rows))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// PUT /api/coachpro/v1/enrollments/{student_id}/{program_id}
pub async fn set_status(
    State(app): State<AppState>,
    who: Identity,
    Path((student_id, program_id)): Path<(i64, i64)>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Enrollment>, AppError> {
    who.require(Capability::Edit)?;
    let status: EnrollmentStatus = body.status.trim().parse()?;
    let enrollment = app
        .with_store(move |s| s.set_enrollment_status(student_id, program_id, status, db::now()))
        .await?;
    Ok(Json(enrollment))
}
