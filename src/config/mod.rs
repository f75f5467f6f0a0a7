// src/config/mod.rs - Bridge configuration
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Development fallback endpoints, used when `environment = "develop"` and no
/// explicit URLs are configured.
const DEVELOP_SERVER_URL: &str = "http://127.0.0.1:8000";
const DEVELOP_WEBSOCKET_URL: &str = "ws://127.0.0.1:8000/ws/printer/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("production environment requires an explicit {0}")]
    MissingEndpoint(&'static str),
}

/// Main configuration structure, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Settings for the server bridge itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default)]
    pub environment: Environment,

    /// HTTP base URL of the remote server (registration endpoint).
    #[serde(default)]
    pub server_url: Option<String>,

    /// WebSocket endpoint for the status stream.
    #[serde(default)]
    pub websocket_url: Option<String>,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Delay between printer disconnect and socket teardown on shutdown, so a
    /// final status push can still go out.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Develop,
    #[default]
    Production,
}

/// Local file storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for locally managed files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Folder (relative to the storage root) where fetched gcode lands.
    #[serde(default = "default_gcode_folder")]
    pub gcode_folder: String,
}

fn default_device_id() -> String {
    "printer-001".to_string()
}
fn default_owner() -> String {
    "local".to_string()
}
fn default_address() -> String {
    "local".to_string()
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_tick_interval_secs() -> u64 {
    1
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_shutdown_grace_secs() -> u64 {
    2
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_gcode_folder() -> String {
    "gcode".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            owner: default_owner(),
            address: default_address(),
            environment: Environment::default(),
            server_url: None,
            websocket_url: None,
            queue_capacity: default_queue_capacity(),
            tick_interval_secs: default_tick_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            gcode_folder: default_gcode_folder(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.environment == Environment::Production {
            if self.bridge.server_url.is_none() {
                return Err(ConfigError::MissingEndpoint("server_url"));
            }
            if self.bridge.websocket_url.is_none() {
                return Err(ConfigError::MissingEndpoint("websocket_url"));
            }
        }
        Ok(())
    }
}

impl BridgeConfig {
    /// Resolved HTTP base URL, falling back to the development server.
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEVELOP_SERVER_URL)
    }

    /// Resolved websocket endpoint, falling back to the development server.
    pub fn websocket_url(&self) -> &str {
        self.websocket_url.as_deref().unwrap_or(DEVELOP_WEBSOCKET_URL)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_grace_secs)
    }
}
