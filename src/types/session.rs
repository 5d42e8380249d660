//! Session Types
//!
//! The per-session token record and the projection handed to the serving layer.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::token::inspector::mask;

/// Identity claims captured at sign-in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Subject identifier (`sub`).
    pub subject: String,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Token state attached to one user session.
///
/// Immutable by convention: every transition produces a new record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Access token expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at_ms: Option<i64>,
    pub profile: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorCode>,
    /// Number of successful refreshes applied to this record.
    #[serde(default)]
    pub generation: u64,
}

impl SessionTokenRecord {
    /// The subject's username.
    pub fn subject_username(&self) -> &str {
        &self.profile.username
    }

    /// Access token, if the record currently holds one.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Whether the record has a token and no error.
    pub fn is_usable(&self) -> bool {
        self.access_token.is_some() && self.last_error.is_none()
    }

    /// Access token expiry as a timestamp.
    pub fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token_expires_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl std::fmt::Debug for SessionTokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenRecord")
            .field("access_token", &self.access_token.as_deref().map(mask))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask))
            .field("id_token", &self.id_token.as_deref().map(mask))
            .field("access_token_expires_at_ms", &self.access_token_expires_at_ms)
            .field("profile", &self.profile)
            .field("last_error", &self.last_error)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Fields exposed to the serving layer. Raw access and refresh tokens never
/// cross this boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProjection {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}
