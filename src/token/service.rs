//! Service Credential Cache
//!
//! Process-wide access token obtained with the client credentials grant,
//! for calling administrative APIs of the identity service.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, Instrument};

use crate::core::{Clock, HttpRequest, HttpTransport, SystemClock};
use crate::error::{create_error_from_response, ProtocolError, SessionResult};
use crate::token::inspector::is_expired;
use crate::types::{GrantType, ServiceCredentialConfig, TokenResponse, DEFAULT_EXPIRES_IN_SECS};
use crate::telemetry::SpanNames;

/// Cached service token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceTokenCache {
    pub value: Option<String>,
    pub expires_at_ms: i64,
}

impl ServiceTokenCache {
    /// Cached value if it stays valid for more than `buffer_secs`.
    pub fn valid_value(&self, buffer_secs: u64, now_ms: i64) -> Option<&str> {
        self.value
            .as_deref()
            .filter(|_| !is_expired(self.expires_at_ms, buffer_secs, now_ms))
    }
}

/// Owns the service token cache and renews it on read.
pub struct ServiceCredentialProvider<T: HttpTransport, C: Clock = SystemClock> {
    config: ServiceCredentialConfig,
    transport: Arc<T>,
    clock: Arc<C>,
    cache: Mutex<ServiceTokenCache>,
}

impl<T: HttpTransport> ServiceCredentialProvider<T, SystemClock> {
    pub fn new(config: ServiceCredentialConfig, transport: Arc<T>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }
}

impl<T: HttpTransport, C: Clock> ServiceCredentialProvider<T, C> {
    pub fn with_clock(config: ServiceCredentialConfig, transport: Arc<T>, clock: Arc<C>) -> Self {
        Self {
            config,
            transport,
            clock,
            cache: Mutex::new(ServiceTokenCache::default()),
        }
    }

    /// Current service access token, fetching a new one when the cached token
    /// is missing or about to expire.
    ///
    /// The cache lock is held across the fetch, so concurrent callers wait
    /// for the same token.
    pub async fn access_token(&self) -> SessionResult<String> {
        let mut cache = self.cache.lock().await;

        if let Some(value) = cache.valid_value(self.config.expiry_buffer_secs, self.clock.now_ms()) {
            debug!("Using cached service token");
            return Ok(value.to_string());
        }

        let fetched = self
            .fetch()
            .instrument(info_span!(SpanNames::SERVICE_TOKEN))
            .await?;
        let value = fetched.value.clone().unwrap_or_default();
        *cache = fetched;
        Ok(value)
    }

    /// Copy of the cache contents.
    pub async fn cached(&self) -> ServiceTokenCache {
        self.cache.lock().await.clone()
    }

    /// Drop the cached token.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = ServiceTokenCache::default();
    }

    fn build_request(&self) -> SessionResult<HttpRequest> {
        let endpoint = self.config.token_endpoint()?;
        let client_secret = self.config.require_client_secret()?;

        let mut fields = vec![
            ("grant_type", GrantType::ClientCredentials.as_str()),
            ("client_secret", client_secret.expose_secret().as_str()),
        ];
        if let Some(client_id) = self.config.client_id.as_deref() {
            fields.push(("client_id", client_id));
        }

        Ok(HttpRequest::form_post(endpoint, &fields).with_timeout(self.config.timeout))
    }

    async fn fetch(&self) -> SessionResult<ServiceTokenCache> {
        let request = self.build_request()?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(response.status, &response.body));
        }

        let body: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            ProtocolError::InvalidJson {
                message: e.to_string(),
            }
        })?;

        let value = body
            .access_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ProtocolError::MissingField {
                field: "access_token".to_string(),
            })?;
        let expires_in = body.positive_expires_in().unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let lifetime_ms = i64::try_from(expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);

        info!(expires_in, "Fetched service token");

        Ok(ServiceTokenCache {
            value: Some(value),
            expires_at_ms: self.clock.now_ms().saturating_add(lifetime_ms),
        })
    }
}
