//! OIDC Session Tokens
//!
//! Server-side access token lifecycle for OIDC sessions.
//!
//! # Features
//!
//! - Structural JWT checks and unverified payload decoding
//! - Expiry detection with a safety buffer
//! - Refresh Token grant (RFC 6749 Section 6) with linear backoff
//! - Classified failures surfaced to the presentation layer as error codes
//! - Per-session single-flight refresh over pluggable storage
//! - Cached service token via the Client Credentials grant (RFC 6749 Section 4.4)
//!
//! # Example
//!
//! ```rust,ignore
//! use oidc_session_tokens::{oidc_config, session_client, ExchangeResult, UserProfile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     oidc_session_tokens::telemetry::init_tracing("info");
//!
//!     let config = oidc_config()
//!         .issuer("https://id.example.com/realms/demo")
//!         .client_id("web")
//!         .client_secret("my-client-secret")
//!         .build()?;
//!
//!     let client = session_client(config)?;
//!
//!     // After the authorization code exchange
//!     client
//!         .sign_in(
//!             "session-id",
//!             ExchangeResult {
//!                 access_token: Some(access_token),
//!                 refresh_token: Some(refresh_token),
//!                 expires_in: Some(300.into()),
//!                 ..Default::default()
//!             },
//!             UserProfile { username: "jdoe".into(), ..Default::default() },
//!         )
//!         .await?;
//!
//!     // On every request
//!     let session = client.session("session-id").await?;
//!     if let Some(code) = session.error {
//!         println!("Re-authentication needed: {}", code.user_message());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, token endpoint payloads and session records
//! - `error`: error codes and the internal error hierarchy
//! - `core`: HTTP transport and clock abstractions
//! - `token`: token inspection, refresh executor and service token cache
//! - `session`: session token store and session storage
//! - `resilience`: retry policy
//! - `telemetry`: tracing setup and refresh counters
//! - `builders`: fluent configuration builders
//! - `client`: high-level client combining the above

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod resilience;
pub mod session;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{session_client, SessionClient};

// Re-export builders
pub use builders::{
    oidc_config, service_credential_config, OidcConfigBuilder, ServiceCredentialConfigBuilder,
};

// Re-export errors
pub use error::{
    create_error_from_response, map_token_error, parse_error_response, ConfigurationError,
    ErrorCode, NetworkError, OAuth2ErrorResponse, ProtocolError, ProviderError, SessionError,
    SessionResult, StorageError,
};

// Re-export types
pub use types::{
    // Config
    GrantType, OidcConfig, ServiceCredentialConfig,
    // Token
    ExchangeResult, TokenResponse,
    // Session
    SessionProjection, SessionTokenRecord, UserProfile,
};

// Re-export core components
pub use crate::core::{
    Clock, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockClock, MockHttpTransport,
    ReqwestHttpTransport, SystemClock,
};

// Re-export token management
pub use token::{
    // Inspector
    decode_unverified_payload, is_expired, mask, validate_structure, TokenValidation,
    // Refresh
    DefaultRefreshExecutor, MockRefreshExecutor, RefreshExecutor, RefreshFailure,
    RefreshOutcome, RefreshedTokens,
    // Service credential
    ServiceCredentialProvider, ServiceTokenCache,
};

// Re-export session management
pub use session::{InMemorySessionStorage, SessionStorage, SessionTokenStore};

// Re-export resilience
pub use resilience::{RetryDecision, RetryPolicy, StopReason, DEFAULT_RETRY_POLICY};

// Re-export telemetry
pub use telemetry::{init_tracing, RefreshMetrics, RefreshMetricsSnapshot, SpanNames};
