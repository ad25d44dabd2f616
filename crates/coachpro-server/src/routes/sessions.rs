use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachpro_core::db;
use coachpro_core::session::SessionMessage;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionsQuery {
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub student_id: Option<i64>,
}

fn message_item(m: &SessionMessage) -> serde_json::Value {
    serde_json::json!({
        "id": m.id,
        "message": m.message,
        "attachment_url": m.attachment_url,
        "meta": m.meta,
        "created_at": m.created_at,
    })
}

/// GET /api/coachpro/v1/sessions: the caller's thread for a program.
/// Reading another student's thread needs the edit capability.
pub async fn list_sessions(
    State(app): State<AppState>,
    who: Identity,
    Query(q): Query<SessionsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let student_id = q.student_id.unwrap_or(who.id());
    who.require_self_or(student_id, Capability::Edit)?;
    let program_id = q.program_id.unwrap_or(0);
    let messages = app
        .with_store(move |s| s.list_session_messages(student_id, program_id))
        .await?;
    Ok(super::items(messages.iter().map(message_item).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    pub student_id: i64,
    pub program_id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

/// POST /api/coachpro/v1/sessions/reply: coach answers in a student's thread.
pub async fn reply(
    State(app): State<AppState>,
    who: Identity,
    Json(body): Json<ReplyBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    who.require(Capability::Edit)?;
    let coach_id = who.id();
    let sent = app
        .with_store(move |s| {
            s.reply_message(
                coach_id,
                body.student_id,
                body.program_id,
                &body.message,
                body.attachment_url.as_deref(),
                db::now(),
            )
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message_item(&sent))))
}
