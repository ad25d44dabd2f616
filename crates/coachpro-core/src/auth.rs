//! Signed auth tokens and short-lived action nonces.
//!
//! Token layout: `base64url(payload) "." base64url(hmac_sha256(secret, payload))`
//! with `payload = "<user_id>|<expires_unix>"`.
//!
//! Nonces are bound to a user, an action name and a time tick of half the
//! configured lifetime. A nonce verifies during its own tick and the one after,
//! so its effective lifetime is between `lifetime / 2` and `lifetime`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CoachError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Action name the form-encoded endpoints sign their nonces with.
pub const AJAX_NONCE_ACTION: &str = "cpl_ajax";

const NONCE_LEN: usize = 12;

fn mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

// ---------------------------------------------------------------------------
// Auth tokens
// ---------------------------------------------------------------------------

pub fn issue_token(key: &[u8], user_id: i64, ttl: Duration, now: DateTime<Utc>) -> String {
    let expires = (now + ttl).timestamp();
    let payload = format!("{user_id}|{expires}");
    let mut m = mac(key);
    m.update(payload.as_bytes());
    let sig = m.finalize().into_bytes();
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(sig)
    )
}

/// Verify a token and return the user id it was issued for.
pub fn verify_token(key: &[u8], token: &str, now: DateTime<Utc>) -> Result<i64> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(CoachError::InvalidToken)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| CoachError::InvalidToken)?;
    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| CoachError::InvalidToken)?;

    let mut m = mac(key);
    m.update(&payload);
    m.verify_slice(&sig).map_err(|_| CoachError::InvalidToken)?;

    let payload = String::from_utf8(payload).map_err(|_| CoachError::InvalidToken)?;
    let (uid, expires) = payload.split_once('|').ok_or(CoachError::InvalidToken)?;
    let uid: i64 = uid.parse().map_err(|_| CoachError::InvalidToken)?;
    let expires: i64 = expires.parse().map_err(|_| CoachError::InvalidToken)?;
    if uid <= 0 {
        return Err(CoachError::InvalidToken);
    }
    if now.timestamp() >= expires {
        return Err(CoachError::TokenExpired);
    }
    Ok(uid)
}

// ---------------------------------------------------------------------------
// Nonces
// ---------------------------------------------------------------------------

fn nonce_tick(now: DateTime<Utc>, lifetime_secs: u64) -> i64 {
    let half = (lifetime_secs / 2).max(1) as i64;
    let t = now.timestamp().max(0);
    (t + half - 1) / half
}

fn nonce_for_tick(key: &[u8], tick: i64, action: &str, user_id: i64) -> String {
    let mut m = mac(key);
    m.update(format!("{tick}|{action}|{user_id}").as_bytes());
    let digest = URL_SAFE_NO_PAD.encode(m.finalize().into_bytes());
    digest[..NONCE_LEN].to_string()
}

pub fn create_nonce(
    key: &[u8],
    action: &str,
    user_id: i64,
    lifetime_secs: u64,
    now: DateTime<Utc>,
) -> String {
    nonce_for_tick(key, nonce_tick(now, lifetime_secs), action, user_id)
}

pub fn verify_nonce(
    key: &[u8],
    nonce: &str,
    action: &str,
    user_id: i64,
    lifetime_secs: u64,
    now: DateTime<Utc>,
) -> Result<()> {
    if nonce.len() != NONCE_LEN {
        return Err(CoachError::InvalidNonce);
    }
    let tick = nonce_tick(now, lifetime_secs);
    for t in [tick, tick - 1] {
        let expected = nonce_for_tick(key, t, action, user_id);
        if constant_time_eq(expected.as_bytes(), nonce.as_bytes()) {
            return Ok(());
        }
    }
    Err(CoachError::InvalidNonce)
}

// ---------------------------------------------------------------------------
// Webhook signatures
// ---------------------------------------------------------------------------

/// Base64 (standard alphabet) HMAC-SHA256 of a raw request body.
pub fn sign_body(key: &[u8], body: &[u8]) -> String {
    let mut m = mac(key);
    m.update(body);
    STANDARD.encode(m.finalize().into_bytes())
}

pub fn verify_body_signature(key: &[u8], body: &[u8], signature: &str) -> Result<()> {
    let sig = STANDARD
        .decode(signature.trim())
        .map_err(|_| CoachError::InvalidSignature)?;
    let mut m = mac(key);
    m.update(body);
    m.verify_slice(&sig).map_err(|_| CoachError::InvalidSignature)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
