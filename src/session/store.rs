//! Session Token Store
//!
//! Decides on every access whether a session's access token is still usable,
//! hands expired ones to the [`RefreshExecutor`], and merges the outcome back
//! into a new [`SessionTokenRecord`].
//!
//! The store never fails a request: refresh failures end up in
//! `SessionTokenRecord::last_error` and the record is kept, so the serving
//! layer can decide whether to prompt for sign-in.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::{Clock, SystemClock};
use crate::error::{ErrorCode, SessionResult, StorageError};
use crate::session::storage::{RefreshGuards, SessionStorage};
use crate::telemetry::{RefreshMetrics, SpanNames};
use crate::token::inspector::is_expired;
use crate::token::refresh::{RefreshExecutor, RefreshFailure, RefreshOutcome};
use crate::types::{
    ExchangeResult, SessionProjection, SessionTokenRecord, UserProfile, DEFAULT_EXPIRES_IN_SECS,
    TOKEN_EXPIRATION_BUFFER_SECS,
};

/// Build the outward projection of a record.
pub fn project_for_presentation(record: &SessionTokenRecord) -> SessionProjection {
    SessionProjection {
        id: record.profile.subject.clone(),
        username: record.profile.username.clone(),
        name: record.profile.name.clone(),
        email: record.profile.email.clone(),
        id_token: record.id_token.clone(),
        error: record.last_error,
    }
}

/// Merge a refresh outcome into a new record.
pub fn apply_outcome(record: &SessionTokenRecord, outcome: RefreshOutcome) -> SessionTokenRecord {
    match outcome {
        RefreshOutcome::Success(tokens) => SessionTokenRecord {
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
            id_token: tokens.id_token.or_else(|| record.id_token.clone()),
            access_token_expires_at_ms: Some(tokens.expires_at_ms),
            profile: record.profile.clone(),
            last_error: None,
            generation: record.generation + 1,
        },
        RefreshOutcome::Failure(failure) => with_error(record, failure.code),
    }
}

fn with_error(record: &SessionTokenRecord, code: ErrorCode) -> SessionTokenRecord {
    SessionTokenRecord {
        access_token: None,
        last_error: Some(code),
        ..record.clone()
    }
}

/// Per-session token lifecycle.
pub struct SessionTokenStore<R: RefreshExecutor, C: Clock = SystemClock> {
    executor: Arc<R>,
    clock: Arc<C>,
    expiration_buffer_secs: u64,
    default_expires_in_secs: u64,
    guards: RefreshGuards,
    metrics: Option<Arc<RefreshMetrics>>,
}

impl<R: RefreshExecutor> SessionTokenStore<R, SystemClock> {
    /// Create a store using the system clock.
    pub fn new(executor: Arc<R>) -> Self {
        Self::with_clock(executor, Arc::new(SystemClock))
    }
}

impl<R: RefreshExecutor, C: Clock> SessionTokenStore<R, C> {
    /// Create a store with an explicit clock.
    pub fn with_clock(executor: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            executor,
            clock,
            expiration_buffer_secs: TOKEN_EXPIRATION_BUFFER_SECS,
            default_expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
            guards: RefreshGuards::new(),
            metrics: None,
        }
    }

    /// Override the expiry buffer.
    pub fn with_expiration_buffer(mut self, buffer_secs: u64) -> Self {
        self.expiration_buffer_secs = buffer_secs;
        self
    }

    /// Count refreshes that fail inside the executor (panics) in `metrics`.
    ///
    /// Pass the executor's own instance; its regular outcomes are already
    /// counted there.
    pub fn with_metrics(mut self, metrics: Arc<RefreshMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Populate a record from the authorization-code exchange.
    pub fn on_initial_sign_in(
        &self,
        exchange: ExchangeResult,
        profile: UserProfile,
    ) -> SessionTokenRecord {
        info!(username = %profile.username, "Initial sign in, storing tokens");

        let expires_at_ms =
            exchange.expires_at_ms(self.clock.now_ms(), self.default_expires_in_secs);

        SessionTokenRecord {
            access_token: exchange.access_token,
            refresh_token: exchange.refresh_token,
            id_token: exchange.id_token,
            access_token_expires_at_ms: Some(expires_at_ms),
            profile,
            last_error: None,
            generation: 0,
        }
    }

    /// Whether `resolve` would call the token endpoint.
    pub fn needs_refresh(&self, record: &SessionTokenRecord) -> bool {
        match record.access_token_expires_at_ms {
            Some(expires_at_ms) => is_expired(
                expires_at_ms,
                self.expiration_buffer_secs,
                self.clock.now_ms(),
            ),
            None => true,
        }
    }

    /// Return a record whose access token is usable, or one carrying the
    /// refresh failure in `last_error`.
    pub async fn resolve(&self, record: &SessionTokenRecord) -> SessionTokenRecord {
        if !self.needs_refresh(record) {
            debug!("Token still valid");
            return record.clone();
        }

        self.refresh_record(record)
            .instrument(info_span!(SpanNames::SESSION_RESOLVE))
            .await
    }

    /// [`resolve`](Self::resolve), abandoned with `NetworkError` once `cancel` fires.
    pub async fn resolve_until_cancelled(
        &self,
        record: &SessionTokenRecord,
        cancel: &CancellationToken,
    ) -> SessionTokenRecord {
        if !self.needs_refresh(record) {
            return record.clone();
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Request cancelled during token refresh");
                with_error(record, ErrorCode::NetworkError)
            }
            resolved = self.resolve(record) => resolved,
        }
    }

    /// Resolve the record stored under `key`, one refresh at a time per key.
    ///
    /// A result older than what is already stored is discarded in favour of
    /// the stored record.
    pub async fn resolve_stored<S: SessionStorage + ?Sized>(
        &self,
        storage: &S,
        key: &str,
    ) -> SessionResult<SessionTokenRecord> {
        let _guard = self.guards.acquire(key).await;

        let record = storage
            .load(key)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })?;

        let resolved = self.resolve(&record).await;
        if resolved == record {
            return Ok(record);
        }

        if storage.save_if_newer(key, resolved.clone()).await? {
            Ok(resolved)
        } else {
            debug!(key, "Discarding stale refresh result");
            storage
                .load(key)
                .await?
                .ok_or_else(|| StorageError::NotFound {
                    key: key.to_string(),
                }.into())
        }
    }

    /// Fields for the serving layer.
    pub fn project_for_presentation(&self, record: &SessionTokenRecord) -> SessionProjection {
        project_for_presentation(record)
    }

    /// End a session by policy: the access token is dropped and the record is
    /// marked `SessionExpired`.
    pub fn expire_session(&self, record: &SessionTokenRecord) -> SessionTokenRecord {
        with_error(record, ErrorCode::SessionExpired)
    }

    async fn refresh_record(&self, record: &SessionTokenRecord) -> SessionTokenRecord {
        info!(
            username = %record.subject_username(),
            "Token expired or expiring soon, refreshing"
        );

        let outcome = AssertUnwindSafe(self.executor.refresh(record.refresh_token.as_deref()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Unexpected error during token refresh");
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(ErrorCode::NetworkError);
                }
                RefreshOutcome::Failure(RefreshFailure::new(
                    ErrorCode::NetworkError,
                    "Unexpected error during token refresh",
                ))
            });

        if let RefreshOutcome::Failure(failure) = &outcome {
            warn!(
                username = %record.subject_username(),
                error_code = %failure.code,
                "Session token refresh failed"
            );
        }

        apply_outcome(record, outcome)
    }
}
