//! Resilience
//!
//! Retry policy for token endpoint calls.

pub mod retry;

pub use retry::{RetryDecision, RetryPolicy, StopReason, DEFAULT_RETRY_POLICY};
