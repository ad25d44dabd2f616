use axum::extract::{Query, State};
use axum::Json;
use coachpro_core::auth::{self, AJAX_NONCE_ACTION};
use coachpro_core::db;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/coachpro/v1/me
pub async fn get_me(who: Identity) -> Json<serde_json::Value> {
    let user = who.0;
    let caps: Vec<_> = user.role.capabilities().iter().map(|c| c.as_str()).collect();
    Json(serde_json::json!({
        "id": user.id,
        "login": user.login,
        "display_name": user.display_name,
        "email": user.email,
        "role": user.role,
        "capabilities": caps,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct NonceQuery {
    #[serde(default)]
    pub action: Option<String>,
}

/// GET /api/coachpro/v1/nonce?action=: nonce for the form endpoints.
pub async fn get_nonce(
    State(app): State<AppState>,
    who: Identity,
    Query(q): Query<NonceQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let action = q
        .action
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| AJAX_NONCE_ACTION.to_string());
    let nonce = auth::create_nonce(
        app.key(),
        &action,
        who.id(),
        app.config.auth.nonce_lifetime_secs,
        db::now(),
    );
    Ok(Json(serde_json::json!({ "action": action, "nonce": nonce })))
}
