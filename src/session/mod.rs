//! Session
//!
//! Session token records: lifecycle management and keyed storage.

pub mod storage;
pub mod store;

pub use storage::{InMemorySessionStorage, RefreshGuards, SessionStorage};
pub use store::{apply_outcome, project_for_presentation, SessionTokenStore};
