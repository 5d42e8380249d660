//! Types
//!
//! Configuration, token endpoint wire formats and session records.

pub mod config;
pub mod session;
pub mod token;

pub use config::*;
pub use session::*;
pub use token::*;
