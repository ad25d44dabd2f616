use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coachpro_core::error::CoachError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CoachError::InvalidInput(msg.into()).into())
    }

    /// Construct a 403 Forbidden error.
    pub fn forbidden() -> Self {
        Self(CoachError::Forbidden("Permission denied.".into()).into())
    }

    pub fn status(&self) -> StatusCode {
        let Some(e) = self.0.downcast_ref::<CoachError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            CoachError::Unauthenticated
            | CoachError::InvalidToken
            | CoachError::TokenExpired
            | CoachError::InvalidSignature => StatusCode::UNAUTHORIZED,
            CoachError::Forbidden(_) | CoachError::InvalidNonce => StatusCode::FORBIDDEN,
            CoachError::UserNotFound(_)
            | CoachError::ProgramNotFound(_)
            | CoachError::CoachNotFound(_)
            | CoachError::EnrollmentNotFound { .. }
            | CoachError::AssessmentNotFound(_)
            | CoachError::ResponseNotFound(_)
            | CoachError::GptNotFound(_) => StatusCode::NOT_FOUND,
            CoachError::UserExists(_) | CoachError::ProgramExists(_) | CoachError::CoachExists(_) => {
                StatusCode::CONFLICT
            }
            CoachError::MissingField(_)
            | CoachError::InvalidInput(_)
            | CoachError::InvalidRulesJson(_)
            | CoachError::InvalidJsonField { .. }
            | CoachError::InvalidSlug(_)
            | CoachError::InvalidRole(_)
            | CoachError::InvalidStatus(_)
            | CoachError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            CoachError::NotInitialized
            | CoachError::UnsupportedSchemaVersion { .. }
            | CoachError::StorePoisoned
            | CoachError::Db(_)
            | CoachError::Io(_)
            | CoachError::Yaml(_)
            | CoachError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Storage failures are logged, not echoed.
    pub fn message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
            "Internal server error.".to_string()
        } else {
            self.0.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.message() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoachError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn auth_failures_map_to_401() {
        assert_eq!(status_of(CoachError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CoachError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CoachError::InvalidSignature), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn forbidden_and_bad_nonce_map_to_403() {
        assert_eq!(status_of(CoachError::InvalidNonce), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(CoachError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(CoachError::ProgramNotFound("7".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(CoachError::GptNotFound(3)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn exists_maps_to_409() {
        assert_eq!(
            status_of(CoachError::ProgramExists("x".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            status_of(CoachError::InvalidRulesJson("eof".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoachError::InvalidDate("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::bad_request("nope").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn non_domain_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error.");
    }

    #[test]
    fn response_is_json() {
        let response = AppError(CoachError::GptNotFound(1).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
