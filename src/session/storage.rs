//! Session Storage
//!
//! Keyed storage for session records plus per-key refresh guards used for
//! single-flight refresh.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::SessionError;
use crate::types::SessionTokenRecord;

/// Session record storage interface.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the record for a session key.
    async fn load(&self, key: &str) -> Result<Option<SessionTokenRecord>, SessionError>;

    /// Store a record unconditionally.
    async fn save(&self, key: &str, record: SessionTokenRecord) -> Result<(), SessionError>;

    /// Store a record unless the stored one has a higher generation.
    ///
    /// Returns whether the record was written.
    async fn save_if_newer(
        &self,
        key: &str,
        record: SessionTokenRecord,
    ) -> Result<bool, SessionError>;

    /// Delete the record for a session key.
    async fn remove(&self, key: &str) -> Result<bool, SessionError>;
}

/// In-memory session storage.
#[derive(Default)]
pub struct InMemorySessionStorage {
    records: Mutex<HashMap<String, SessionTokenRecord>>,
}

impl InMemorySessionStorage {
    /// Create new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionTokenRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn load(&self, key: &str) -> Result<Option<SessionTokenRecord>, SessionError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn save(&self, key: &str, record: SessionTokenRecord) -> Result<(), SessionError> {
        self.lock().insert(key.to_string(), record);
        Ok(())
    }

    async fn save_if_newer(
        &self,
        key: &str,
        record: SessionTokenRecord,
    ) -> Result<bool, SessionError> {
        let mut records = self.lock();
        if let Some(current) = records.get(key) {
            if current.generation > record.generation {
                return Ok(false);
            }
        }
        records.insert(key.to_string(), record);
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, SessionError> {
        Ok(self.lock().remove(key).is_some())
    }
}

/// Per-key async locks serializing refreshes of the same session.
#[derive(Default)]
pub struct RefreshGuards {
    guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RefreshGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive refresh rights on `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let guard = {
            let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody else holds can go
            guards.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
            guards
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        guard.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.guards.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
