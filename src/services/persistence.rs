//! Write-through persistence of the session snapshot.
//!
//! Storage failures never leave this module: the first failure flips the gateway into degraded
//! mode for the rest of the runtime's life and the session keeps playing in memory.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    dao::{kv_store::KeyValueStore, models::SessionEntity, storage::StorageError},
    state::session::GameSession,
};

/// What happened to a snapshot handed to [`PersistenceGateway::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Written to the store.
    Persisted,
    /// Not written: the gateway already runs in memory only.
    Volatile,
    /// Not written: this write failed and the gateway just became degraded.
    Degraded,
}

/// Reads and writes the session snapshot under a single key.
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    key: String,
    degraded: watch::Sender<bool>,
}

impl PersistenceGateway {
    /// Persist under `key` in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let (degraded, _rx) = watch::channel(false);
        Self {
            store,
            key: key.into(),
            degraded,
        }
    }

    /// Storage key of the snapshot.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Read the stored snapshot.
    ///
    /// Returns `None` when nothing is stored, when the stored value cannot be decoded (the
    /// session then starts fresh and overwrites it) and when the store fails.
    pub fn load(&self) -> Option<SessionEntity> {
        if self.is_degraded() {
            return None;
        }

        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored session");
                return None;
            }
            Err(err) => {
                self.enter_degraded(&err);
                return None;
            }
        };

        match serde_json::from_str::<SessionEntity>(&raw) {
            Ok(entity) => {
                debug!(key = %self.key, session_id = %entity.session_id, "stored session loaded");
                Some(entity)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "stored session is undecodable; starting fresh");
                None
            }
        }
    }

    /// Write the snapshot of `session`.
    pub fn save(&self, session: &GameSession, now: OffsetDateTime) -> SaveStatus {
        if self.is_degraded() {
            return SaveStatus::Volatile;
        }

        let entity = session.to_entity(now);
        let raw = match serde_json::to_string(&entity) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to encode session snapshot");
                return SaveStatus::Volatile;
            }
        };

        match self.store.set(&self.key, &raw) {
            Ok(()) => SaveStatus::Persisted,
            Err(err) => {
                if self.enter_degraded(&err) {
                    SaveStatus::Degraded
                } else {
                    SaveStatus::Volatile
                }
            }
        }
    }

    /// Delete the stored snapshot.
    pub fn clear(&self) -> SaveStatus {
        if self.is_degraded() {
            return SaveStatus::Volatile;
        }

        match self.store.remove(&self.key) {
            Ok(()) => {
                info!(key = %self.key, "stored session cleared");
                SaveStatus::Persisted
            }
            Err(err) => {
                if self.enter_degraded(&err) {
                    SaveStatus::Degraded
                } else {
                    SaveStatus::Volatile
                }
            }
        }
    }

    /// Flip into degraded mode. Returns `true` when the flag changed.
    fn enter_degraded(&self, err: &StorageError) -> bool {
        let changed = self.degraded.send_if_modified(|degraded| {
            if *degraded {
                false
            } else {
                *degraded = true;
                true
            }
        });
        if changed {
            warn!(
                key = %self.key,
                error = %err,
                "storage failed; continuing with an in-memory session"
            );
        }
        changed
    }
}
