//! Token
//!
//! Access token inspection, the refresh-token exchange and the service
//! credential cache.

pub mod inspector;
pub mod refresh;
pub mod service;

pub use inspector::{
    decode_unverified_payload, is_expired, is_expired_now, is_expired_with_default_buffer,
    is_structurally_valid, mask, validate_structure, TokenValidation,
};
pub use refresh::{
    validate_token_response, DefaultRefreshExecutor, MockRefreshExecutor, RefreshExecutor,
    RefreshFailure, RefreshOutcome, RefreshedTokens,
};
pub use service::{ServiceCredentialProvider, ServiceTokenCache};
