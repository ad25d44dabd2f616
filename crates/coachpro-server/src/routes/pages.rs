use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use coachpro_core::error::CoachError;
use coachpro_core::seo;
use coachpro_core::types::PublishStatus;

use crate::error::AppError;
use crate::state::AppState;

/// GET /coaching-programs/{slug}: public program page with JSON-LD.
pub async fn program_page(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let lookup = slug.clone();
    let found = app
        .with_store(move |s| {
            let program = match s.find_program_by_slug(&lookup) {
                Ok(p) if p.status == PublishStatus::Publish => p,
                Ok(_) | Err(CoachError::ProgramNotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            };
            let currency = s.load_settings()?.currency;
            Ok(Some((program, currency)))
        })
        .await?;

    let Some((program, currency)) = found else {
        let body = format!(
            "<!DOCTYPE html><html><head><title>Not Found</title></head>\
             <body><h1>Program not found</h1><p>{}</p></body></html>",
            seo::escape_html(&slug)
        );
        return Ok((StatusCode::NOT_FOUND, Html(body)).into_response());
    };
    let page = seo::render_program_page(
        &program,
        &app.config.site.name,
        app.config.site.base_url(),
        &currency,
    );
    Ok(Html(page).into_response())
}
