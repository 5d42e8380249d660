//! Session Token Errors
//!
//! Two layers: [`ErrorCode`] is the machine-readable taxonomy that travels on
//! a session record to the serving layer, and [`SessionError`] is the internal
//! error hierarchy used by transports, configuration and storage.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error code surfaced to the serving layer through a session record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Generic, possibly transient refresh failure.
    #[serde(rename = "RefreshAccessTokenError")]
    RefreshTokenError,
    /// The refresh token was revoked or has expired.
    #[serde(rename = "RefreshTokenExpired")]
    RefreshTokenExpired,
    /// Malformed token or token endpoint response.
    #[serde(rename = "InvalidToken")]
    InvalidToken,
    /// Configuration or transport failure before any HTTP response.
    #[serde(rename = "NetworkError")]
    NetworkError,
    /// Reserved for the serving layer's own session policy.
    #[serde(rename = "SessionExpired")]
    SessionExpired,
}

impl ErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshTokenError => "RefreshAccessTokenError",
            Self::RefreshTokenExpired => "RefreshTokenExpired",
            Self::InvalidToken => "InvalidToken",
            Self::NetworkError => "NetworkError",
            Self::SessionExpired => "SessionExpired",
        }
    }

    /// Whether retrying the refresh can never fix this failure.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::RefreshTokenExpired | Self::InvalidToken)
    }

    /// Whether the user has to go through the sign-in flow again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::RefreshTokenExpired | Self::SessionExpired)
    }

    /// User-facing message for a sign-in-again prompt.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RefreshTokenError => "Your session could not be renewed. Please sign in again.",
            Self::RefreshTokenExpired => "Your session has expired. Please sign in again.",
            Self::InvalidToken => {
                "The authentication service returned an invalid response. Please sign in again."
            }
            Self::NetworkError => {
                "The authentication service is unreachable. Please try again later."
            }
            Self::SessionExpired => "Your session has ended. Please sign in again.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RefreshAccessTokenError" => Ok(Self::RefreshTokenError),
            "RefreshTokenExpired" => Ok(Self::RefreshTokenExpired),
            "InvalidToken" => Ok(Self::InvalidToken),
            "NetworkError" => Ok(Self::NetworkError),
            "SessionExpired" => Ok(Self::SessionExpired),
            other => Err(ProtocolError::InvalidResponse {
                message: format!("unknown error code: {}", other),
            }),
        }
    }
}

/// Root error type.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Map to the code carried on a session record.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) | Self::Network(_) => ErrorCode::NetworkError,
            Self::Protocol(_) => ErrorCode::InvalidToken,
            Self::Provider(ProviderError::InvalidGrant { .. }) => ErrorCode::RefreshTokenExpired,
            Self::Provider(_) => ErrorCode::RefreshTokenError,
            Self::Storage(_) => ErrorCode::SessionExpired,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Provider(ProviderError::ServerError { .. }) => true,
            Self::Provider(ProviderError::TemporarilyUnavailable { .. }) => true,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required setting: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::TlsError { .. } | Self::Cancelled)
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Provider (token endpoint) error.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unauthorized client for this grant type")]
    UnauthorizedClient { error_description: Option<String> },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable { retry_after: Option<Duration> },
}

/// Session storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Session not found: {key}")]
    NotFound { key: String },

    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },
}

/// Result type for session token operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuth2ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

impl OAuth2ErrorResponse {
    /// Best human-readable description: `error_description`, then `error`.
    pub fn description(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Whether the provider rejected the grant itself.
    pub fn is_invalid_grant(&self) -> bool {
        self.error.as_deref() == Some("invalid_grant")
    }
}

/// Parse error response from HTTP body; an unparseable body yields an empty response.
pub fn parse_error_response(body: &str) -> OAuth2ErrorResponse {
    serde_json::from_str(body).unwrap_or_default()
}

/// Map a token endpoint error response to a provider error.
pub fn map_token_error(status: u16, response: &OAuth2ErrorResponse) -> ProviderError {
    match response.error.as_deref() {
        Some("invalid_client") => ProviderError::InvalidClient {
            error_description: response.error_description.clone(),
        },
        Some("invalid_grant") => ProviderError::InvalidGrant {
            message: response.description(),
        },
        Some("unauthorized_client") => ProviderError::UnauthorizedClient {
            error_description: response.error_description.clone(),
        },
        Some("temporarily_unavailable") => {
            ProviderError::TemporarilyUnavailable { retry_after: None }
        }
        Some("server_error") => ProviderError::ServerError {
            message: response.description(),
        },
        Some(_) => ProviderError::InvalidRequest {
            message: response.description(),
        },
        None => match status {
            400 => ProviderError::InvalidRequest {
                message: "Bad request".to_string(),
            },
            401 => ProviderError::InvalidClient {
                error_description: Some("Unauthorized".to_string()),
            },
            403 => ProviderError::UnauthorizedClient {
                error_description: Some("Forbidden".to_string()),
            },
            429 => ProviderError::TemporarilyUnavailable {
                retry_after: Some(Duration::from_secs(60)),
            },
            _ => ProviderError::ServerError {
                message: format!("HTTP {}", status),
            },
        },
    }
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> SessionError {
    SessionError::Provider(map_token_error(status, &parse_error_response(body)))
}
