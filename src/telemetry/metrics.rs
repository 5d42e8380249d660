//! Metrics
//!
//! Counters for refresh activity.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorCode;

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub retries: u64,
    pub refresh_token_errors: u64,
    pub refresh_token_expired: u64,
    pub invalid_token: u64,
    pub network_errors: u64,
    pub session_expired: u64,
}

impl RefreshMetricsSnapshot {
    /// Failures across all codes.
    pub fn failures(&self) -> u64 {
        self.refresh_token_errors
            + self.refresh_token_expired
            + self.invalid_token
            + self.network_errors
            + self.session_expired
    }
}

/// Refresh counters. One instance is shared by an executor and its callers.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
    attempts: AtomicU64,
    successes: AtomicU64,
    retries: AtomicU64,
    refresh_token_errors: AtomicU64,
    refresh_token_expired: AtomicU64,
    invalid_token: AtomicU64,
    network_errors: AtomicU64,
    session_expired: AtomicU64,
}

impl RefreshMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One token endpoint request was sent.
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed attempt is followed by another one.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// A refresh call ended in failure.
    pub fn record_failure(&self, code: ErrorCode) {
        let counter = match code {
            ErrorCode::RefreshTokenError => &self.refresh_token_errors,
            ErrorCode::RefreshTokenExpired => &self.refresh_token_expired,
            ErrorCode::InvalidToken => &self.invalid_token,
            ErrorCode::NetworkError => &self.network_errors,
            ErrorCode::SessionExpired => &self.session_expired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RefreshMetricsSnapshot {
        RefreshMetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            refresh_token_errors: self.refresh_token_errors.load(Ordering::Relaxed),
            refresh_token_expired: self.refresh_token_expired.load(Ordering::Relaxed),
            invalid_token: self.invalid_token.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            session_expired: self.session_expired.load(Ordering::Relaxed),
        }
    }
}
