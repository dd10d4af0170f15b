//! TOML-based application configuration.
//!
//! Stores:
//! - Tick cadence
//! - Database location
//! - Defaults for new timers
//! - Which events the CLI announces
//!
//! Configuration is stored at `~/.config/timerdeck/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Relative paths resolve against the data directory.
    #[serde(default = "default_database")]
    pub database: String,
}

/// Defaults applied when a timer is added without explicit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub halfway_alert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub halfway: bool,
    #[serde(default = "default_true")]
    pub completion: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timerdeck/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_interval_ms() -> u64 {
    1000
}
fn default_database() -> String {
    "timerdeck.db".into()
}
fn default_category() -> String {
    "General".into()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            halfway_alert: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            halfway: true,
            completion: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            storage: StorageConfig::default(),
            defaults: DefaultsConfig::default(),
            notifications: NotificationsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot assign to a section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds an invalid value, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::load`], for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Same as [`Config::save`], for an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Call [`Config::save`] to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.tick.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick.interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.defaults.category.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "defaults.category".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick.interval_ms)
    }

    /// Absolute database path.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn database_path(&self) -> Result<PathBuf> {
        let configured = PathBuf::from(&self.storage.database);
        if configured.is_absolute() {
            Ok(configured)
        } else {
            Ok(data_dir()?.join(configured))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tick.interval_ms, 1000);
        assert_eq!(parsed.defaults.category, "General");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[tick]\ninterval_ms = 250\n").unwrap();
        assert_eq!(parsed.tick_interval(), Duration::from_millis(250));
        assert!(parsed.notifications.completion);
        assert_eq!(parsed.log_level, "info");
    }

    #[test]
    fn get_and_set_by_path() {
        let mut cfg = Config::default();
        assert_eq!(cfg.get("tick.interval_ms").as_deref(), Some("1000"));
        cfg.set("tick.interval_ms", "500").unwrap();
        cfg.set("defaults.halfway_alert", "true").unwrap();
        cfg.set("defaults.category", "Work").unwrap();
        assert_eq!(cfg.tick.interval_ms, 500);
        assert!(cfg.defaults.halfway_alert);
        assert_eq!(cfg.get("defaults.category").as_deref(), Some("Work"));
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(cfg.set("nope", "1").is_err());
        assert!(cfg.set("tick", "1").is_err());
        assert!(cfg.set("tick.interval_ms", "fast").is_err());
        assert!(cfg.set("tick.interval_ms", "0").is_err());
        assert_eq!(cfg.tick.interval_ms, 1000);
    }

    #[test]
    fn load_from_rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tick]\ninterval_ms = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "tick.interval_ms"
        ));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert!(path.exists());
    }
}
