use axum::extract::{Query, State};
use axum::Json;
use coachpro_core::analytics::{parse_date, AnalyticsQuery, Snapshot, SnapshotInput};
use coachpro_core::db;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/coachpro/v1/analytics?program_id&from&to
pub async fn list_analytics(
    State(app): State<AppState>,
    who: Identity,
    Query(q): Query<AnalyticsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::View)?;
    let rows = app.with_store(move |s| s.query_analytics(&q)).await?;
    Ok(super::items(rows))
}

/// POST /api/coachpro/v1/analytics: upsert one snapshot.
pub async fn record_snapshot(
    State(app): State<AppState>,
    who: Identity,
    Json(input): Json<SnapshotInput>,
) -> Result<Json<Snapshot>, AppError> {
    who.require(Capability::Manage)?;
    let snapshot = app
        .with_store(move |s| s.record_snapshot(&input, db::now()))
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct ComputeBody {
    pub program_id: i64,
    /// `YYYY-MM-DD`; today (UTC) when omitted.
    #[serde(default)]
    pub date: Option<String>,
}

/// POST /api/coachpro/v1/analytics/compute
pub async fn compute_snapshot(
    State(app): State<AppState>,
    who: Identity,
    Json(body): Json<ComputeBody>,
) -> Result<Json<Snapshot>, AppError> {
    who.require(Capability::Manage)?;
    let now = db::now();
    let date = match body.date.as_deref() {
        Some(d) => parse_date(d)?,
        None => now.date_naive(),
    };
    let snapshot = app
        .with_store(move |s| s.compute_snapshot(body.program_id, date, now))
        .await?;
    tracing::info!(program_id = body.program_id, %date, "analytics snapshot computed");
    Ok(Json(snapshot))
}
