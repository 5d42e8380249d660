//! Token Inspector
//!
//! Stateless helpers for bearer tokens: structural validation, expiry with a
//! safety buffer, masking for logs, and unverified payload decoding.
//!
//! Nothing here verifies signatures or claims. The provider's signing key is
//! never held by this crate.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{Clock, SystemClock};
use crate::types::TOKEN_EXPIRATION_BUFFER_SECS;

/// Outcome of [`validate_structure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenValidation {
    pub is_valid: bool,
    pub reason: Option<&'static str>,
}

impl TokenValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    fn invalid(reason: &'static str) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

fn is_base64url_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Check that `token` looks like a compact JWS: three non-empty base64url
/// segments separated by dots.
pub fn validate_structure(token: &str) -> TokenValidation {
    if token.is_empty() {
        return TokenValidation::invalid("Token is empty");
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return TokenValidation::invalid("Token does not have 3 parts");
    }

    if !parts.iter().all(|part| is_base64url_segment(part)) {
        return TokenValidation::invalid("Token parts are not valid base64url encoding");
    }

    TokenValidation::valid()
}

/// Shorthand for `validate_structure(token).is_valid`.
pub fn is_structurally_valid(token: &str) -> bool {
    validate_structure(token).is_valid
}

/// True when `now_ms >= expires_at_ms - buffer_secs * 1000`.
pub fn is_expired(expires_at_ms: i64, buffer_secs: u64, now_ms: i64) -> bool {
    let buffer_ms = i64::try_from(buffer_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    now_ms >= expires_at_ms.saturating_sub(buffer_ms)
}

/// [`is_expired`] against the system clock.
pub fn is_expired_now(expires_at_ms: i64, buffer_secs: u64) -> bool {
    is_expired(expires_at_ms, buffer_secs, SystemClock.now_ms())
}

/// [`is_expired_now`] with the default 60 second buffer.
pub fn is_expired_with_default_buffer(expires_at_ms: i64) -> bool {
    is_expired_now(expires_at_ms, TOKEN_EXPIRATION_BUFFER_SECS)
}

/// Mask a token for diagnostics: `***` below 20 characters, otherwise the
/// first and last 10 characters around `...`.
pub fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 20 {
        return "***".to_string();
    }

    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Decode the payload segment without any verification.
///
/// Returns `None` for anything that is not three segments with a base64url
/// JSON object in the middle. Diagnostics only.
pub fn decode_unverified_payload(token: &str) -> Option<Map<String, Value>> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Failed to decode token payload");
            return None;
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Token payload is not JSON");
            None
        }
    }
}
