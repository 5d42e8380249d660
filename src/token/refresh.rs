//! Refresh Executor
//!
//! Performs the `grant_type=refresh_token` exchange against the provider,
//! validates the response, classifies failures and retries transient ones
//! with linear backoff.
//!
//! Expected failure modes never surface as `Err`: [`RefreshExecutor::refresh`]
//! always returns a [`RefreshOutcome`].

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::{Clock, HttpRequest, HttpTransport, SystemClock};
use crate::error::{parse_error_response, ConfigurationError, ErrorCode, SessionError};
use crate::resilience::{RetryDecision, RetryPolicy, StopReason};
use crate::telemetry::{RefreshMetrics, SpanNames};
use crate::token::inspector::{mask, validate_structure};
use crate::types::{GrantType, OidcConfig, TokenResponse};

/// Tokens obtained from a successful refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Access token expiry in epoch milliseconds.
    pub expires_at_ms: i64,
    /// Rotated refresh token, or the one that was presented.
    pub refresh_token: String,
    /// New ID token, when the provider issued one.
    pub id_token: Option<String>,
}

/// Classified refresh failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshFailure {
    pub code: ErrorCode,
    pub http_status: Option<u16>,
    pub description: String,
}

impl RefreshFailure {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            http_status: None,
            description: description.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Permanent failures stop the retry loop: an expired refresh token, an
    /// invalid response, or any HTTP 400.
    pub fn is_permanent(&self) -> bool {
        self.code.is_permanent() || self.http_status == Some(400)
    }

    fn from_error(error: &SessionError) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}

/// Result of one `refresh` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success(RefreshedTokens),
    Failure(RefreshFailure),
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error code of a failed outcome.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.code),
        }
    }
}

/// Refresh executor interface.
#[async_trait]
pub trait RefreshExecutor: Send + Sync {
    /// Exchange `refresh_token` for a new access token.
    async fn refresh(&self, refresh_token: Option<&str>) -> RefreshOutcome;
}

/// Check a 2xx token endpoint body: non-empty `access_token`, positive integer
/// `expires_in`, and a structurally valid access token.
pub fn validate_token_response(response: &TokenResponse) -> Result<(String, u64), RefreshFailure> {
    let access_token = response
        .access_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            RefreshFailure::new(ErrorCode::InvalidToken, "Missing access_token in response")
        })?;

    let expires_in = response.positive_expires_in().ok_or_else(|| {
        RefreshFailure::new(ErrorCode::InvalidToken, "Invalid expires_in value")
    })?;

    if !validate_structure(access_token).is_valid {
        return Err(RefreshFailure::new(
            ErrorCode::InvalidToken,
            "Received invalid access token",
        ));
    }

    Ok((access_token.to_string(), expires_in))
}

/// Refresh executor backed by an [`HttpTransport`].
pub struct DefaultRefreshExecutor<T: HttpTransport, C: Clock = SystemClock> {
    config: OidcConfig,
    policy: RetryPolicy,
    transport: Arc<T>,
    clock: Arc<C>,
    metrics: Arc<RefreshMetrics>,
}

impl<T: HttpTransport> DefaultRefreshExecutor<T, SystemClock> {
    /// Create an executor using the system clock.
    pub fn new(config: OidcConfig, transport: Arc<T>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }
}

impl<T: HttpTransport, C: Clock> DefaultRefreshExecutor<T, C> {
    /// Create an executor with an explicit clock.
    pub fn with_clock(config: OidcConfig, transport: Arc<T>, clock: Arc<C>) -> Self {
        let policy = RetryPolicy::new(config.max_refresh_attempts, config.refresh_retry_delay);
        Self {
            config,
            policy,
            transport,
            clock,
            metrics: Arc::new(RefreshMetrics::new()),
        }
    }

    /// Share a metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<RefreshMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn metrics(&self) -> &Arc<RefreshMetrics> {
        &self.metrics
    }

    fn build_request(&self, refresh_token: &str) -> Result<HttpRequest, ConfigurationError> {
        let endpoint = self.config.token_endpoint()?;
        let client_id = self.config.require_client_id()?;
        let client_secret = self.config.require_client_secret()?;

        Ok(HttpRequest::form_post(
            endpoint,
            &[
                ("grant_type", GrantType::RefreshToken.as_str()),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
            ],
        )
        .with_timeout(self.config.timeout))
    }

    async fn attempt(
        &self,
        request: HttpRequest,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, RefreshFailure> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshFailure::from_error(&e))?;

        if !response.is_success() {
            let error = parse_error_response(&response.body);
            let code = if response.status == 400 && error.is_invalid_grant() {
                ErrorCode::RefreshTokenExpired
            } else {
                ErrorCode::RefreshTokenError
            };
            return Err(RefreshFailure::new(code, error.description()).with_status(response.status));
        }

        let body: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            RefreshFailure::new(ErrorCode::InvalidToken, format!("Invalid JSON: {}", e))
                .with_status(response.status)
        })?;

        let (access_token, expires_in) =
            validate_token_response(&body).map_err(|f| f.with_status(response.status))?;

        let lifetime_ms = i64::try_from(expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);

        Ok(RefreshedTokens {
            access_token,
            expires_at_ms: self.clock.now_ms().saturating_add(lifetime_ms),
            refresh_token: body
                .refresh_token
                .filter(|token| !token.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            id_token: body.id_token.filter(|token| !token.is_empty()),
        })
    }

    async fn run(&self, refresh_token: Option<&str>) -> RefreshOutcome {
        let Some(refresh_token) = refresh_token.filter(|token| !token.is_empty()) else {
            error!("No refresh token available");
            self.metrics.record_failure(ErrorCode::RefreshTokenError);
            return RefreshOutcome::Failure(RefreshFailure::new(
                ErrorCode::RefreshTokenError,
                "No refresh token available",
            ));
        };

        let request = match self.build_request(refresh_token) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Missing OIDC configuration");
                self.metrics.record_failure(ErrorCode::NetworkError);
                return RefreshOutcome::Failure(RefreshFailure::from_error(&SessionError::from(e)));
            }
        };

        info!(token_mask = %mask(refresh_token), "Starting token refresh");

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.metrics.record_attempt();

            let failure = match self.attempt(request.clone(), refresh_token).await {
                Ok(tokens) => {
                    info!(
                        attempt,
                        expires_at_ms = tokens.expires_at_ms,
                        rotated = tokens.refresh_token != refresh_token,
                        "Token refresh successful"
                    );
                    self.metrics.record_success();
                    return RefreshOutcome::Success(tokens);
                }
                Err(failure) => failure,
            };

            warn!(
                attempt,
                error_code = %failure.code,
                http_status = ?failure.http_status,
                description = %failure.description,
                "Refresh attempt failed"
            );

            match self.policy.decide(attempt, failure.is_permanent()) {
                RetryDecision::Retry { delay } => {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before retry");
                    self.metrics.record_retry();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Stop(reason) => {
                    match reason {
                        StopReason::Permanent => {
                            error!(error_code = %failure.code, "Permanent error detected, not retrying")
                        }
                        StopReason::Exhausted => {
                            error!(error_code = %failure.code, attempts = attempt, "All refresh attempts failed")
                        }
                    }
                    self.metrics.record_failure(failure.code);
                    return RefreshOutcome::Failure(failure);
                }
            }
        }
    }
}

#[async_trait]
impl<T: HttpTransport, C: Clock> RefreshExecutor for DefaultRefreshExecutor<T, C> {
    async fn refresh(&self, refresh_token: Option<&str>) -> RefreshOutcome {
        self.run(refresh_token)
            .instrument(info_span!(SpanNames::TOKEN_REFRESH))
            .await
    }
}

/// Mock refresh executor for testing. Outcomes are served in the order queued.
#[derive(Default)]
pub struct MockRefreshExecutor {
    outcomes: Mutex<VecDeque<RefreshOutcome>>,
    refresh_history: Mutex<Vec<Option<String>>>,
}

impl MockRefreshExecutor {
    /// Create new mock executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next outcome.
    pub fn queue_outcome(&self, outcome: RefreshOutcome) -> &Self {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
        self
    }

    /// Refresh tokens presented so far.
    pub fn get_refresh_history(&self) -> Vec<Option<String>> {
        self.refresh_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.refresh_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl RefreshExecutor for MockRefreshExecutor {
    async fn refresh(&self, refresh_token: Option<&str>) -> RefreshOutcome {
        self.refresh_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(refresh_token.map(str::to_string));

        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                RefreshOutcome::Failure(RefreshFailure::new(
                    ErrorCode::RefreshTokenError,
                    "No mock outcome available",
                ))
            })
    }
}
