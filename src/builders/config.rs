//! Configuration Builder
//!
//! Fluent builders for the OIDC and service credential settings.

use secrecy::SecretString;
use std::time::Duration;

use crate::error::{ConfigurationError, SessionResult};
use crate::types::{token_endpoint_for, OidcConfig, ServiceCredentialConfig};

/// OIDC configuration builder.
#[derive(Default)]
pub struct OidcConfigBuilder {
    config: OidcConfig,
}

impl OidcConfigBuilder {
    /// Create new configuration builder with default timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one read from the environment.
    pub fn from_config(config: OidcConfig) -> Self {
        Self { config }
    }

    /// Set issuer base URL.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = Some(issuer.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set token endpoint timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Seconds before expiry at which a token counts as expired.
    pub fn expiration_buffer_secs(mut self, secs: u64) -> Self {
        self.config.expiration_buffer_secs = secs;
        self
    }

    pub fn max_refresh_attempts(mut self, attempts: u32) -> Self {
        self.config.max_refresh_attempts = attempts;
        self
    }

    pub fn refresh_retry_delay(mut self, delay: Duration) -> Self {
        self.config.refresh_retry_delay = delay;
        self
    }

    /// Build the configuration.
    ///
    /// Only settings that are present are validated; missing ones are reported
    /// when a refresh is attempted.
    pub fn build(self) -> SessionResult<OidcConfig> {
        if let Some(issuer) = self.config.issuer.as_deref() {
            token_endpoint_for(issuer)?;
        }
        if self.config.max_refresh_attempts == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "max_refresh_attempts".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(self.config)
    }
}

/// Service credential configuration builder.
#[derive(Default)]
pub struct ServiceCredentialConfigBuilder {
    config: ServiceCredentialConfig,
}

impl ServiceCredentialConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set identity service base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn expiry_buffer_secs(mut self, secs: u64) -> Self {
        self.config.expiry_buffer_secs = secs;
        self
    }

    /// Build the configuration. Base URL and secret are both required.
    pub fn build(self) -> SessionResult<ServiceCredentialConfig> {
        self.config.token_endpoint()?;
        self.config.require_client_secret()?;
        Ok(self.config)
    }
}

/// Create a new OIDC configuration builder.
pub fn oidc_config() -> OidcConfigBuilder {
    OidcConfigBuilder::new()
}

/// Create a new service credential configuration builder.
pub fn service_credential_config() -> ServiceCredentialConfigBuilder {
    ServiceCredentialConfigBuilder::new()
}
