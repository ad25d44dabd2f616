use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use coachpro_core::auth;
use coachpro_core::commerce::OrderCompleted;
use coachpro_core::db;
use coachpro_core::error::CoachError;
use coachpro_core::types::Capability;
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-wc-webhook-signature";

#[derive(Debug, Deserialize)]
pub struct MapBody {
    pub program_id: i64,
}

/// PUT /api/coachpro/v1/products/{product_id}/program
pub async fn map_product(
    State(app): State<AppState>,
    who: Identity,
    Path(product_id): Path<i64>,
    Json(body): Json<MapBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::Manage)?;
    let program_id = body.program_id;
    app.with_store(move |s| s.map_product(product_id, program_id, db::now()))
        .await?;
    Ok(Json(serde_json::json!({
        "product_id": product_id,
        "program_id": program_id,
    })))
}

/// DELETE /api/coachpro/v1/products/{product_id}/program
pub async fn unmap_product(
    State(app): State<AppState>,
    who: Identity,
    Path(product_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    who.require(Capability::Manage)?;
    let removed = app.with_store(move |s| s.unmap_product(product_id)).await?;
    Ok(Json(serde_json::json!({
        "product_id": product_id,
        "removed": removed,
    })))
}

/// POST /api/coachpro/v1/woocommerce/order-completed
///
/// Signed order webhook. The body must carry a valid
/// `X-WC-Webhook-Signature` for the configured secret.
pub async fn order_completed(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(secret) = app.config.commerce.webhook_secret.clone() else {
        tracing::warn!("order webhook rejected: no webhook secret configured");
        return Err(CoachError::InvalidSignature.into());
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if let Err(e) = auth::verify_body_signature(secret.as_bytes(), &body, signature) {
        tracing::warn!("order webhook rejected: bad signature");
        return Err(e.into());
    }

    // The store pings a new webhook with a form body before sending orders.
    if body.starts_with(b"webhook_id=") {
        return Ok(Json(serde_json::json!({ "ping": true })));
    }

    let order: OrderCompleted = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid order payload: {e}")))?;
    let result = app
        .with_store(move |s| s.handle_order_completed(&order, db::now()))
        .await?;
    match result.skipped {
        Some(reason) => {
            tracing::warn!(order_id = result.order_id, ?reason, "order skipped")
        }
        None => tracing::info!(
            order_id = result.order_id,
            enrolled = result.enrolled.len(),
            "order processed"
        ),
    }
    Ok(Json(serde_json::to_value(result)?))
}
