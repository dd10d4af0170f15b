mod config;
pub mod database;
pub mod gateway;
pub mod worker;

pub use config::{Config, DefaultsConfig, NotificationsConfig, StorageConfig, TickConfig};
pub use database::Database;
pub use gateway::{ExportSnapshot, KeyValueStore, MemoryStore, PersistenceGateway};
pub use worker::{PersistHandle, PersistRequest, PersistenceWorker, WriteStats};

use std::path::PathBuf;

/// Returns `~/.config/timerdeck[-dev]/` based on TIMERDECK_ENV.
///
/// Set TIMERDECK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMERDECK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timerdeck-dev")
    } else {
        base_dir.join("timerdeck")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
