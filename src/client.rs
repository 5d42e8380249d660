//! Session Client
//!
//! High-level entry point wiring transport, refresh executor, session store
//! and storage together for a serving layer.

use std::sync::Arc;

use crate::core::{HttpTransport, ReqwestHttpTransport, SystemClock};
use crate::error::SessionResult;
use crate::session::{InMemorySessionStorage, SessionStorage, SessionTokenStore};
use crate::telemetry::{RefreshMetrics, RefreshMetricsSnapshot};
use crate::token::DefaultRefreshExecutor;
use crate::types::{ExchangeResult, OidcConfig, SessionProjection, SessionTokenRecord, UserProfile};

/// Session client keyed by session id.
pub struct SessionClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: SessionStorage = InMemorySessionStorage,
> {
    store: SessionTokenStore<DefaultRefreshExecutor<T>, SystemClock>,
    storage: Arc<S>,
    metrics: Arc<RefreshMetrics>,
}

impl SessionClient<ReqwestHttpTransport, InMemorySessionStorage> {
    /// Create a client with the reqwest transport and in-memory storage.
    pub fn new(config: OidcConfig) -> SessionResult<Self> {
        let transport = ReqwestHttpTransport::with_options(
            config.timeout,
            crate::core::MAX_RESPONSE_SIZE,
        )?;
        Ok(Self::with_components(
            config,
            transport,
            InMemorySessionStorage::new(),
        ))
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> SessionResult<Self> {
        Self::new(OidcConfig::from_env()?)
    }
}

impl<T: HttpTransport, S: SessionStorage> SessionClient<T, S> {
    /// Create a client with custom implementations.
    pub fn with_components(config: OidcConfig, transport: T, storage: S) -> Self {
        let metrics = Arc::new(RefreshMetrics::new());
        let buffer_secs = config.expiration_buffer_secs;
        let executor =
            DefaultRefreshExecutor::new(config, Arc::new(transport)).with_metrics(metrics.clone());

        Self {
            store: SessionTokenStore::new(Arc::new(executor))
                .with_expiration_buffer(buffer_secs)
                .with_metrics(metrics.clone()),
            storage: Arc::new(storage),
            metrics,
        }
    }

    /// Store the tokens from a completed sign-in under `key`.
    pub async fn sign_in(
        &self,
        key: &str,
        exchange: ExchangeResult,
        profile: UserProfile,
    ) -> SessionResult<SessionProjection> {
        let record = self.store.on_initial_sign_in(exchange, profile);
        let projection = self.store.project_for_presentation(&record);
        self.storage.save(key, record).await?;
        Ok(projection)
    }

    /// Resolve the session under `key`, refreshing its access token if needed.
    pub async fn record(&self, key: &str) -> SessionResult<SessionTokenRecord> {
        self.store.resolve_stored(self.storage.as_ref(), key).await
    }

    /// Resolve the session under `key` and project it for presentation.
    pub async fn session(&self, key: &str) -> SessionResult<SessionProjection> {
        let record = self.record(key).await?;
        Ok(self.store.project_for_presentation(&record))
    }

    /// Usable access token for `key`, if the session has one.
    pub async fn access_token(&self, key: &str) -> SessionResult<Option<String>> {
        let record = self.record(key).await?;
        Ok(record.access_token().map(str::to_string))
    }

    /// Mark the session under `key` as expired.
    pub async fn expire(&self, key: &str) -> SessionResult<SessionProjection> {
        let record = self.record(key).await?;
        let expired = self.store.expire_session(&record);
        let projection = self.store.project_for_presentation(&expired);
        self.storage.save(key, expired).await?;
        Ok(projection)
    }

    /// Forget the session under `key`.
    pub async fn sign_out(&self, key: &str) -> SessionResult<bool> {
        self.storage.remove(key).await
    }

    pub fn store(&self) -> &SessionTokenStore<DefaultRefreshExecutor<T>, SystemClock> {
        &self.store
    }

    pub fn metrics(&self) -> RefreshMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Create a session client with default implementations.
pub fn session_client(config: OidcConfig) -> SessionResult<SessionClient> {
    SessionClient::new(config)
}
