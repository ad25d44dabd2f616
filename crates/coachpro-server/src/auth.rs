//! Request identity.
//!
//! A caller proves who they are with a signed token, sent either as
//! `Authorization: Bearer <token>` or in the `coachpro_auth` cookie.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use coachpro_core::auth;
use coachpro_core::db;
use coachpro_core::error::CoachError;
use coachpro_core::types::Capability;
use coachpro_core::user::User;

use crate::error::AppError;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "coachpro_auth";
pub const NONCE_HEADER: &str = "x-coachpro-nonce";

/// An authenticated caller. Rejects with 401 when no valid token is present.
#[derive(Debug, Clone)]
pub struct Identity(pub User);

/// The caller when one is present; `None` for anonymous or invalid tokens.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<User>);

impl Identity {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn can(&self, cap: Capability) -> bool {
        self.0.can(cap)
    }

    pub fn require(&self, cap: Capability) -> Result<(), AppError> {
        if self.can(cap) {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }

    /// Allowed when acting on one's own records or holding `cap`.
    pub fn require_self_or(&self, user_id: i64, cap: Capability) -> Result<(), AppError> {
        if self.id() == user_id {
            Ok(())
        } else {
            self.require(cap)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(&parts.headers)
        .or_else(|| cookie_value(&parts.headers, AUTH_COOKIE))
        .ok_or(CoachError::Unauthenticated)?;
    let user_id = auth::verify_token(state.key(), &token, db::now())?;
    state
        .with_store(move |s| match s.load_user(user_id) {
            Err(CoachError::UserNotFound(_)) => Err(CoachError::InvalidToken),
            other => other,
        })
        .await
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(Identity)
    }
}

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Ok(user) => Ok(MaybeIdentity(Some(user))),
            Err(e) if e.status() == axum::http::StatusCode::UNAUTHORIZED => Ok(MaybeIdentity(None)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_and_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; coachpro_auth=tok.sig; other=1"),
        );
        assert_eq!(cookie_value(&headers, AUTH_COOKIE).as_deref(), Some("tok.sig"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("coachpro_auth_old=x"));
        assert_eq!(cookie_value(&headers, AUTH_COOKIE), None);
    }
}
