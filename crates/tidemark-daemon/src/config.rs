//! Configuration file parsing for the daemon.
//!
//! Loads the retention settings, the store location and the metrics
//! listener address from a TOML file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tidemark_retention::RetentionConfig;

/// Daemon configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Daemon configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    /// Retention scanner settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Message store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics listener settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Message store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per mailbox
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Metrics listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 9000); 0 picks a free port
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/spool/tidemark")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    9000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
        }
    }
}

impl HttpConfig {
    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store.path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.http.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "http.bind_address",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
