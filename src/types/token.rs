//! Token Types
//!
//! Token endpoint wire formats and the sign-in exchange result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token endpoint success body, as received.
///
/// Fields are kept loose so that a malformed body can be reported as an
/// invalid token rather than a parse failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<serde_json::Number>,
    /// Rotated refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// ID token (OIDC).
    #[serde(default)]
    pub id_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenResponse {
    /// `expires_in` when it is a positive integer.
    pub fn positive_expires_in(&self) -> Option<u64> {
        self.expires_in
            .as_ref()
            .and_then(serde_json::Number::as_u64)
            .filter(|secs| *secs > 0)
    }
}

/// Result of the authorization-code exchange performed by the OIDC handshake.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExchangeResult {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Absolute expiry in epoch seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<serde_json::Number>,
}

impl ExchangeResult {
    /// Access token expiry in epoch milliseconds.
    ///
    /// `expires_at` wins; otherwise `now + expires_in`, with `default_secs`
    /// when neither is present.
    pub fn expires_at_ms(&self, now_ms: i64, default_secs: u64) -> i64 {
        match self.expires_at {
            Some(secs) => secs.saturating_mul(1000),
            None => {
                let lifetime = self.positive_expires_in().unwrap_or(default_secs);
                let lifetime_ms = i64::try_from(lifetime.saturating_mul(1000)).unwrap_or(i64::MAX);
                now_ms.saturating_add(lifetime_ms)
            }
        }
    }

    /// `expires_in` when it is a positive integer.
    pub fn positive_expires_in(&self) -> Option<u64> {
        self.expires_in
            .as_ref()
            .and_then(serde_json::Number::as_u64)
            .filter(|secs| *secs > 0)
    }
}
