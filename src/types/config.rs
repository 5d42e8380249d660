//! Configuration Types
//!
//! Provider and client settings consumed by the refresh executor and the
//! service credential cache.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, SessionError, SessionResult};

/// Token endpoint path, appended to the issuer URL.
pub const OIDC_TOKEN_ENDPOINT_PATH: &str = "/protocol/openid-connect/token";

/// Maximum refresh attempts per `refresh` call.
pub const MAX_REFRESH_RETRY_ATTEMPTS: u32 = 3;

/// Base delay of the linear refresh backoff.
pub const REFRESH_RETRY_DELAY_MS: u64 = 1000;

/// Refresh this many seconds before the access token actually expires.
pub const TOKEN_EXPIRATION_BUFFER_SECS: u64 = 60;

/// Lifetime assumed when a sign-in exchange carries no expiry.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Service credential tokens are renewed this long before expiry.
pub const SERVICE_TOKEN_BUFFER_SECS: u64 = 30;

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// OAuth2 grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "refresh_token")]
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Build `{base}/protocol/openid-connect/token`, validating the base URL.
pub fn token_endpoint_for(base: &str) -> Result<String, ConfigurationError> {
    let trimmed = base.trim_end_matches('/');
    let endpoint = format!("{}{}", trimmed, OIDC_TOKEN_ENDPOINT_PATH);
    Url::parse(&endpoint).map_err(|_| ConfigurationError::InvalidEndpoint {
        url: base.to_string(),
    })?;
    Ok(endpoint)
}

/// OIDC client configuration for per-session token refresh.
///
/// Provider settings are optional here; their absence is reported when a
/// refresh is attempted, not at construction.
#[derive(Clone)]
pub struct OidcConfig {
    /// Issuer base URL (realm URL).
    pub issuer: Option<String>,
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<SecretString>,
    /// HTTP timeout per token endpoint call.
    pub timeout: Duration,
    /// Seconds before expiry at which a token counts as expired.
    pub expiration_buffer_secs: u64,
    /// Maximum refresh attempts.
    pub max_refresh_attempts: u32,
    /// Base delay of the linear backoff.
    pub refresh_retry_delay: Duration,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            client_id: None,
            client_secret: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            expiration_buffer_secs: TOKEN_EXPIRATION_BUFFER_SECS,
            max_refresh_attempts: MAX_REFRESH_RETRY_ATTEMPTS,
            refresh_retry_delay: Duration::from_millis(REFRESH_RETRY_DELAY_MS),
        }
    }
}

impl OidcConfig {
    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OIDC_ISSUER` (or `NEXT_PUBLIC_AUTH_OIDC_ISSUER`): issuer base URL
    /// - `OIDC_CLIENT_ID` (or `AUTHIO_ID`): client identifier
    /// - `OIDC_CLIENT_SECRET` (or `AUTH_SECRET`): client secret
    /// - `OIDC_HTTP_TIMEOUT_SECS` (optional): token endpoint timeout
    /// - `OIDC_REFRESH_BUFFER_SECS` (optional): expiry buffer
    /// - `OIDC_REFRESH_MAX_ATTEMPTS` (optional): refresh attempts
    /// - `OIDC_REFRESH_RETRY_DELAY_MS` (optional): backoff base delay
    pub fn from_env() -> SessionResult<Self> {
        let mut config = Self {
            issuer: env_any(&["OIDC_ISSUER", "NEXT_PUBLIC_AUTH_OIDC_ISSUER"]),
            client_id: env_any(&["OIDC_CLIENT_ID", "AUTHIO_ID"]),
            client_secret: env_any(&["OIDC_CLIENT_SECRET", "AUTH_SECRET"]).map(SecretString::new),
            ..Self::default()
        };

        if let Some(secs) = env_number::<u64>("OIDC_HTTP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number::<u64>("OIDC_REFRESH_BUFFER_SECS")? {
            config.expiration_buffer_secs = secs;
        }
        if let Some(attempts) = env_number::<u32>("OIDC_REFRESH_MAX_ATTEMPTS")? {
            config.max_refresh_attempts = attempts;
        }
        if let Some(ms) = env_number::<u64>("OIDC_REFRESH_RETRY_DELAY_MS")? {
            config.refresh_retry_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Full token endpoint URL.
    pub fn token_endpoint(&self) -> Result<String, ConfigurationError> {
        let issuer = self
            .issuer
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("issuer"))?;
        token_endpoint_for(issuer)
    }

    /// Client identifier, required for refresh.
    pub fn require_client_id(&self) -> Result<&str, ConfigurationError> {
        self.client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("client_id"))
    }

    /// Client secret, required for refresh.
    pub fn require_client_secret(&self) -> Result<&SecretString, ConfigurationError> {
        self.client_secret.as_ref().ok_or_else(|| missing("client_secret"))
    }
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("expiration_buffer_secs", &self.expiration_buffer_secs)
            .field("max_refresh_attempts", &self.max_refresh_attempts)
            .field("refresh_retry_delay", &self.refresh_retry_delay)
            .finish()
    }
}

/// Settings for the process-wide service credential (client credentials grant).
#[derive(Clone)]
pub struct ServiceCredentialConfig {
    /// Identity service base URL.
    pub base_url: Option<String>,
    /// Client identifier, sent only when set.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<SecretString>,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Seconds before expiry at which the cached token is renewed.
    pub expiry_buffer_secs: u64,
}

impl Default for ServiceCredentialConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            client_id: None,
            client_secret: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            expiry_buffer_secs: SERVICE_TOKEN_BUFFER_SECS,
        }
    }
}

impl ServiceCredentialConfig {
    /// Reads `AUTHIO_URL`, `AUTHIO_SECRET` and the optional `AUTHIO_CLIENT_ID`.
    pub fn from_env() -> Self {
        Self {
            base_url: env_any(&["AUTHIO_URL"]),
            client_id: env_any(&["AUTHIO_CLIENT_ID"]),
            client_secret: env_any(&["AUTHIO_SECRET"]).map(SecretString::new),
            ..Self::default()
        }
    }

    /// Full token endpoint URL.
    pub fn token_endpoint(&self) -> Result<String, ConfigurationError> {
        let base = self
            .base_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("base_url"))?;
        token_endpoint_for(base)
    }

    /// Client secret, required for the grant.
    pub fn require_client_secret(&self) -> Result<&SecretString, ConfigurationError> {
        self.client_secret.as_ref().ok_or_else(|| missing("client_secret"))
    }
}

impl std::fmt::Debug for ServiceCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentialConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("expiry_buffer_secs", &self.expiry_buffer_secs)
            .finish()
    }
}

fn missing(field: &str) -> ConfigurationError {
    ConfigurationError::MissingRequired {
        field: field.to_string(),
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> SessionResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            SessionError::Configuration(ConfigurationError::InvalidValue {
                field: name.to_string(),
                value: raw,
            })
        }),
        Err(_) => Ok(None),
    }
}
