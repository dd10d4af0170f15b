//! Persistence gateway for the timer collection and history log.
//!
//! Both collections are stored as opaque JSON blobs under two fixed keys.
//! Loads never fail: a missing key or an undecodable blob yields an empty
//! collection. Saves report failures to the caller.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::error::{DatabaseError, PersistenceError};
use crate::timer::{Timer, TimerLog};

pub const TIMERS_KEY: &str = "@TimerApp:timers";
pub const TIMER_LOGS_KEY: &str = "@TimerApp:timerLogs";

/// Durable string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        self.kv_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.kv_set(key, value)
    }
}

/// Process-local store, used by tests and one-off sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| DatabaseError::QueryFailed("memory store poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DatabaseError::QueryFailed("memory store poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Combined read-only dump for sharing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub timers: Vec<Timer>,
    pub logs: Vec<TimerLog>,
    /// ISO-8601 / RFC 3339.
    pub exported_at: String,
}

pub struct PersistenceGateway {
    store: Box<dyn KeyValueStore>,
}

impl PersistenceGateway {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn load_timers(&self) -> Vec<Timer> {
        self.load_or_empty(TIMERS_KEY)
    }

    pub fn load_logs(&self) -> Vec<TimerLog> {
        self.load_or_empty(TIMER_LOGS_KEY)
    }

    /// # Errors
    /// Returns a [`PersistenceError`] if encoding or the write fails.
    pub fn save_timers(&self, timers: &[Timer]) -> Result<(), PersistenceError> {
        self.save(TIMERS_KEY, timers)
    }

    /// # Errors
    /// Returns a [`PersistenceError`] if encoding or the write fails.
    pub fn save_logs(&self, logs: &[TimerLog]) -> Result<(), PersistenceError> {
        self.save(TIMER_LOGS_KEY, logs)
    }

    /// Serialize the persisted timers and logs as one JSON document.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] if the dump cannot be encoded.
    pub fn export_snapshot(&self, now: DateTime<Utc>) -> Result<String, PersistenceError> {
        let snapshot = ExportSnapshot {
            timers: self.load_timers(),
            logs: self.load_logs(),
            exported_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    fn load_or_empty<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.try_load(key) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "starting with an empty collection");
                Vec::new()
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, PersistenceError> {
        let read_error = |message: String| PersistenceError::Read {
            key: key.to_string(),
            message,
        };
        match self.store.get(key).map_err(|e| read_error(e.to_string()))? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| read_error(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(items)?;
        self.store.set(key, &json).map_err(|e| PersistenceError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(key, count = items.len(), "saved");
        Ok(())
    }
}
