use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Complete homewire configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomewireConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// SQLite storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("smart_home.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Event listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Events returned by GET /events when no limit is given
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,
}

fn default_list_limit() -> usize {
    50
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_list_limit: default_list_limit(),
        }
    }
}

/// Live observer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Frames buffered per observer before it is evicted as stalled
    #[serde(default = "default_queue_capacity")]
    pub observer_queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    crate::subscription::DEFAULT_QUEUE_CAPACITY
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            observer_queue_capacity: default_queue_capacity(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config file {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl HomewireConfig {
    /// Apply `HOMEWIRE_*` overrides, reading variables through `lookup`.
    ///
    /// Unparseable values are ignored and the existing setting is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOMEWIRE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("HOMEWIRE_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("HOMEWIRE_EVENTS_LIMIT") {
            if let Ok(n) = v.parse::<usize>() {
                if n > 0 {
                    self.events.default_list_limit = n;
                }
            }
        }
        if let Some(v) = lookup("HOMEWIRE_OBSERVER_QUEUE_CAPACITY") {
            if let Ok(n) = v.parse::<usize>() {
                if n > 0 {
                    self.subscription.observer_queue_capacity = n;
                }
            }
        }
    }

    /// Reject values that would break the service at request time
    pub fn validate(&self) -> Result<(), String> {
        if self.events.default_list_limit == 0 {
            return Err("events.default_list_limit must be greater than 0".to_string());
        }
        if self.subscription.observer_queue_capacity == 0 {
            return Err("subscription.observer_queue_capacity must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<HomewireConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: HomewireConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default(path: &Path) -> Result<HomewireConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No config file, using defaults");
            Ok(HomewireConfig::default())
        }
        other => other,
    }
}
