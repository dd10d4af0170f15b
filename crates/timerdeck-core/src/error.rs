//! Core error types for timerdeck-core.
//!
//! Timer operations on unknown ids are no-ops, so there is no "not found"
//! variant here. Only malformed input and storage-boundary failures are
//! reported.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timerdeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence gateway errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A thread panicked while holding the engine lock
    #[error("Timer engine lock poisoned")]
    LockPoisoned,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: &str) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors at the persistence boundary.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading a key from the backing store failed
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    /// Writing a key to the backing store failed
    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },

    /// Encoding a snapshot failed
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoreError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
