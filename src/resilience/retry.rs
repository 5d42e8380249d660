//! Retry Logic
//!
//! Linear backoff retry policy for token refresh, expressed as an explicit
//! decision step: after each failed attempt the caller asks the policy whether
//! to stop or how long to wait.

use std::time::Duration;

use crate::types::{MAX_REFRESH_RETRY_ATTEMPTS, REFRESH_RETRY_DELAY_MS};

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `base_delay * n`.
    pub base_delay: Duration,
    /// Upper bound for a single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        DEFAULT_RETRY_POLICY
    }
}

/// Default retry policy: 3 attempts, 1s then 2s.
pub const DEFAULT_RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: MAX_REFRESH_RETRY_ATTEMPTS,
    base_delay: Duration::from_millis(REFRESH_RETRY_DELAY_MS),
    max_delay: Duration::from_secs(30),
};

/// Why the retry loop ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The failure cannot be fixed by retrying.
    Permanent,
    /// All attempts were used.
    Exhausted,
}

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then attempt again.
    Retry { delay: Duration },
    /// Give up and report the last failure.
    Stop(StopReason),
}

impl RetryPolicy {
    /// Create a policy with the given attempts and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..DEFAULT_RETRY_POLICY
        }
    }

    /// Wait after the 1-based `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.max(1))
            .min(self.max_delay)
    }

    /// Decide what follows a failure on the 1-based `attempt`.
    pub fn decide(&self, attempt: u32, permanent: bool) -> RetryDecision {
        if permanent {
            RetryDecision::Stop(StopReason::Permanent)
        } else if attempt >= self.max_attempts {
            RetryDecision::Stop(StopReason::Exhausted)
        } else {
            RetryDecision::Retry {
                delay: self.delay_after(attempt),
            }
        }
    }
}
