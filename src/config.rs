//! Configuration module for Sputnik
//!
//! JSON configuration; every section is optional and falls back to the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable that overrides the client listen port
pub const PORT_ENV: &str = "RUPPELLS_SOCKETS_LOCAL_PORT";

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "sputnik.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,

    /// IRC client listener
    #[serde(default)]
    pub listen: ListenConfig,

    /// Configuration web server
    #[serde(default)]
    pub web: WebConfig,

    /// Persistence
    #[serde(default)]
    pub datastore: DatastoreConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load `sputnik.json` from the working directory, or use defaults
    pub fn discover() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// IRC client listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Bind host; empty means every interface
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_listen_port")]
    pub port: u16,
}

fn default_listen_port() -> u16 {
    6667
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_listen_port(),
        }
    }
}

impl ListenConfig {
    /// Port to listen on, honoring the environment override
    pub fn effective_port(&self) -> Result<u16> {
        port_override(std::env::var(PORT_ENV).ok().as_deref(), self.port)
    }
}

/// Apply a port override value, if any
pub fn port_override(value: Option<&str>, default: u16) -> Result<u16> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("Invalid port in {}: {}", PORT_ENV, value))),
        None => Ok(default),
    }
}

/// Configuration web server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address (e.g., "127.0.0.1:8080")
    #[serde(default = "default_web_listen")]
    pub listen: String,
}

fn default_true() -> bool {
    true
}

fn default_web_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_web_listen(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Run memory-only when false
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SQLite database file
    #[serde(default = "default_datastore_path")]
    pub path: PathBuf,
}

fn default_datastore_path() -> PathBuf {
    PathBuf::from("sputnik.db")
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_datastore_path(),
        }
    }
}
