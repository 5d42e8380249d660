//! Builders
//!
//! Fluent builder patterns for configuration.

pub mod config;

pub use config::{
    oidc_config, service_credential_config, OidcConfigBuilder, ServiceCredentialConfigBuilder,
};
