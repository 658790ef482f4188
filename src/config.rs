//! Configuration management module.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::types::{SOCKET_PORT, UDP_PORT_TYPE1, UDP_PORT_TYPE1_NEW_VERSION};
use crate::protocol::{DeviceTarget, ProtocolVersion};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Switcher device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub ip_address: String,
    /// Device id as reported in broadcasts (6 hex chars).
    pub device_id: String,
    /// TCP command port (default: 9957).
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// TCP operation timeout in seconds (default: 10).
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_secs: u64,
    #[serde(default)]
    pub protocol: ProtocolVersion,
    /// Only sent to legacy devices.
    #[serde(default = "default_phone_id")]
    pub phone_id: String,
    /// Only sent to legacy devices.
    #[serde(default = "default_device_password")]
    pub device_password: String,
}

fn default_tcp_port() -> u16 {
    SOCKET_PORT
}

fn default_tcp_timeout_secs() -> u64 {
    10
}

fn default_phone_id() -> String {
    "0000".to_string()
}

fn default_device_password() -> String {
    "00000000".to_string()
}

/// Broadcast listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_udp_ports")]
    pub udp_ports: Vec<u16>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_udp_ports() -> Vec<u16> {
    vec![UDP_PORT_TYPE1, UDP_PORT_TYPE1_NEW_VERSION]
}

fn default_channel_capacity() -> usize {
    32
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write daily rolling log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_hexdigit())
}

impl AppConfig {
    /// Get config file path (platform config directory).
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "switcher-link")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.device.device_id.is_empty() && !is_hex_of_len(&self.device.device_id, 6) {
            return Err(ConfigError::Validation(
                "Device id must be 6 hex characters".to_string(),
            ));
        }
        if !is_hex_of_len(&self.device.phone_id, 4) {
            return Err(ConfigError::Validation("Phone id must be 4 hex characters".to_string()));
        }
        if !is_hex_of_len(&self.device.device_password, 8) {
            return Err(ConfigError::Validation(
                "Device password must be 8 hex characters".to_string(),
            ));
        }
        if self.device.tcp_port == 0 {
            return Err(ConfigError::Validation("TCP port must be greater than 0".to_string()));
        }
        if self.device.tcp_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "TCP timeout must be at least 1 second".to_string(),
            ));
        }
        if self.bridge.udp_ports.is_empty() {
            return Err(ConfigError::Validation(
                "At least one UDP port is required".to_string(),
            ));
        }
        if self.bridge.udp_ports.contains(&0) {
            return Err(ConfigError::Validation("UDP ports must be greater than 0".to_string()));
        }
        if self.bridge.channel_capacity < 1 {
            return Err(ConfigError::Validation(
                "Channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl DeviceConfig {
    /// Packet addressing for the configured device.
    pub fn target(&self) -> DeviceTarget {
        DeviceTarget::new(self.device_id.to_lowercase(), self.protocol)
            .with_credentials(self.phone_id.to_lowercase(), self.device_password.to_lowercase())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ip_address: String::new(),
            device_id: String::new(),
            tcp_port: default_tcp_port(),
            tcp_timeout_secs: default_tcp_timeout_secs(),
            protocol: ProtocolVersion::default(),
            phone_id: default_phone_id(),
            device_password: default_device_password(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            udp_ports: default_udp_ports(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
