//! Telemetry
//!
//! Logging goes through `tracing`; this module holds the span and field names
//! used across the crate, a subscriber initializer for binaries and tests, and
//! the refresh counters.

pub mod metrics;

pub use metrics::{RefreshMetrics, RefreshMetricsSnapshot};

use tracing_subscriber::EnvFilter;

/// Span names.
pub struct SpanNames;

impl SpanNames {
    pub const TOKEN_REFRESH: &'static str = "oidc.token_refresh";
    pub const SESSION_RESOLVE: &'static str = "oidc.session_resolve";
    pub const SERVICE_TOKEN: &'static str = "oidc.service_token";
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `default_filter`.
///
/// Returns `false` when a global subscriber was already set.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
