//! Form-encoded action endpoints used by the student-facing pages.
//!
//! Every action needs an authenticated caller and a `cpl_ajax` nonce, sent as
//! the `nonce` form field or the `X-CoachPro-Nonce` header. Replies use the
//! `{"success": bool, "data": {...}}` envelope.

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use coachpro_core::auth::{self, AJAX_NONCE_ACTION};
use coachpro_core::db;
use coachpro_core::error::CoachError;
use coachpro_core::session::Author;

use crate::auth::{MaybeIdentity, NONCE_HEADER};
use crate::error::AppError;
use crate::state::AppState;

type Fields = HashMap<String, String>;

/// Reply envelope of the action endpoints.
pub struct Envelope(Result<serde_json::Value, AppError>);

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(data) => Json(serde_json::json!({ "success": true, "data": data })).into_response(),
            Err(e) => {
                let status = e.status();
                let body = serde_json::json!({
                    "success": false,
                    "data": { "message": e.message() },
                });
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Non-negative integer form value; anything unparsable reads as 0.
fn absint(fields: &Fields, key: &str) -> i64 {
    fields
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|n| i64::try_from(n.unsigned_abs()).ok())
        .unwrap_or(0)
}

fn text<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields.get(key).map(String::as_str)
}

fn message(text: &str) -> serde_json::Value {
    serde_json::json!({ "message": text })
}

/// POST /ajax/{action}
pub async fn dispatch(
    State(app): State<AppState>,
    Path(action): Path<String>,
    MaybeIdentity(user): MaybeIdentity,
    headers: HeaderMap,
    form: Result<Form<Fields>, FormRejection>,
) -> Envelope {
    Envelope(run(app, action, user, headers, form).await)
}

async fn run(
    app: AppState,
    action: String,
    user: Option<coachpro_core::user::User>,
    headers: HeaderMap,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<serde_json::Value, AppError> {
    let user = user.ok_or(CoachError::Unauthenticated)?;
    let Form(fields) = form.map_err(|e| AppError::bad_request(e.body_text()))?;

    let nonce = text(&fields, "nonce")
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(NONCE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();
    auth::verify_nonce(
        app.key(),
        nonce.trim(),
        AJAX_NONCE_ACTION,
        user.id,
        app.config.auth.nonce_lifetime_secs,
        db::now(),
    )?;

    let student_id = user.id;
    let program_id = absint(&fields, "program_id");
    let coach_id = absint(&fields, "coach_id");

    match action.as_str() {
        "enroll-program" => {
            let outcome = app
                .with_store(move |s| s.enroll(student_id, program_id, db::now()))
                .await?;
            Ok(serde_json::json!({
                "message": "Enrolled successfully.",
                "outcome": outcome,
            }))
        }
        "start-session" => {
            app.with_store(move |s| s.start_session(student_id, coach_id, program_id, db::now()))
                .await?;
            Ok(message("Session opened."))
        }
        "send-message" => {
            let body = text(&fields, "message").unwrap_or_default().to_string();
            let attachment = text(&fields, "attachment_url").map(str::to_string);
            app.with_store(move |s| {
                s.send_message(
                    Author::Student,
                    student_id,
                    coach_id,
                    program_id,
                    &body,
                    attachment.as_deref(),
                    db::now(),
                )
            })
            .await?;
            Ok(message("Message sent."))
        }
        "get-progress" => {
            if program_id == 0 {
                return Err(CoachError::MissingField("Program required.".into()).into());
            }
            let p = app
                .with_store(move |s| s.get_progress(student_id, program_id))
                .await?;
            Ok(serde_json::json!({
                "progress": {
                    "lessons_total": p.lessons_total,
                    "lessons_done": p.lessons_done,
                    "avg_score": p.avg_score,
                    "last_active": p.last_active,
                }
            }))
        }
        other => Err(AppError(
            CoachError::InvalidInput(format!("unknown action: {other}")).into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn envelope_status(e: Envelope) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn absint_reads_loose_numbers() {
        let mut f = Fields::new();
        f.insert("a".into(), " 12 ".into());
        f.insert("b".into(), "-4".into());
        f.insert("c".into(), "twelve".into());
        f.insert("min".into(), i64::MIN.to_string());
        f.insert("max".into(), i64::MAX.to_string());
        f.insert("huge".into(), "99999999999999999999".into());
        assert_eq!(absint(&f, "a"), 12);
        assert_eq!(absint(&f, "b"), 4);
        assert_eq!(absint(&f, "c"), 0);
        assert_eq!(absint(&f, "missing"), 0);
        assert_eq!(absint(&f, "min"), 0);
        assert_eq!(absint(&f, "max"), i64::MAX);
        assert_eq!(absint(&f, "huge"), 0);
    }

    #[test]
    fn envelope_failure_keeps_status() {
        let err = Envelope(Err(CoachError::Unauthenticated.into()));
        assert_eq!(envelope_status(err), StatusCode::UNAUTHORIZED);
        let ok = Envelope(Ok(message("fine")));
        assert_eq!(envelope_status(ok), StatusCode::OK);
    }
}
