pub mod ajax;
pub mod analytics;
pub mod assessments;
pub mod coaches;
pub mod commerce;
pub mod enrollments;
pub mod gpts;
pub mod me;
pub mod pages;
pub mod profiles;
pub mod programs;
pub mod progress;
pub mod recommendations;
pub mod sessions;
pub mod settings;

use serde::Serialize;

/// List responses are wrapped as `{"items": [...]}`.
pub(crate) fn items<T: Serialize>(items: Vec<T>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "items": items }))
}
