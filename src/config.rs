//! # Configuration Management
//!
//! Centralized configuration for the framing and P2P codec layers.
//!
//! The notification-server pool has no built-in protocol vocabulary: the set of
//! commands that carry a trailing payload length is supplied here and turned into a
//! [`CommandSet`](crate::core::pool::CommandSet) by the caller.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Notification-server commands followed by a payload of declared length
pub const DEFAULT_PAYLOAD_COMMANDS: [&str; 12] = [
    "SDG", "NFY", "PUT", "DEL", "ADL", "RML", "MSG", "NOT", "GCF", "GET", "IPG", "FSL",
];

/// Initial capacity of each per-block accumulation buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Body size used when slicing a data stream into P2P data messages
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1202;

/// Upper bound for a single length-prefixed direct-connection frame (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WireConfig {
    /// Notification-server pool configuration
    #[serde(default)]
    pub pool: PoolConfig,

    /// P2P codec configuration
    #[serde(default)]
    pub p2p: P2pConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_OPEN))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_READ))
        })?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_PARSE))
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(commands) = std::env::var("MSNP_WIRE_PAYLOAD_COMMANDS") {
            config.pool.payload_commands = commands
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(size) = std::env::var("MSNP_WIRE_MAX_CHUNK_SIZE") {
            config.p2p.max_chunk_size = size.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MSNP_WIRE_MAX_CHUNK_SIZE: {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("MSNP_WIRE_MAX_FRAME_SIZE") {
            config.p2p.max_frame_size = size.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MSNP_WIRE_MAX_FRAME_SIZE: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_SERIALIZE))
        })?;

        std::fs::write(path, content).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_WRITE))
        })?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.pool.validate());
        errors.extend(self.p2p.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Notification-server pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Three-letter commands whose line ends with a payload length
    pub payload_commands: Vec<String>,

    /// Whether any three-digit numeric token (an error code) carries a payload
    pub numeric_codes_carry_payload: bool,

    /// Initial capacity of each accumulation buffer
    pub initial_buffer_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            payload_commands: DEFAULT_PAYLOAD_COMMANDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            numeric_codes_carry_payload: true,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for command in &self.payload_commands {
            if command.len() != 3 || !command.is_ascii() {
                errors.push(format!(
                    "Invalid payload command '{command}' (expected exactly 3 ASCII characters)"
                ));
            }
        }

        if self.initial_buffer_capacity == 0 {
            errors.push("Initial buffer capacity must be greater than 0".to_string());
        } else if self.initial_buffer_capacity > 1024 * 1024 {
            errors.push(format!(
                "Initial buffer capacity too large: {} (maximum: 1 MB)",
                self.initial_buffer_capacity
            ));
        }

        errors
    }
}

/// P2P codec configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct P2pConfig {
    /// Maximum body size of a single data message
    pub max_chunk_size: usize,

    /// Maximum accepted length prefix of a direct-connection frame
    pub max_frame_size: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl P2pConfig {
    /// Validate P2P configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_chunk_size == 0 {
            errors.push("Max chunk size must be greater than 0".to_string());
        } else if self.max_chunk_size > u32::MAX as usize {
            errors.push(format!(
                "Max chunk size too large: {} (must fit the 32-bit message size field)",
                self.max_chunk_size
            ));
        }

        if self.max_frame_size < crate::p2p::wire::HEADER_SIZE {
            errors.push(format!(
                "Max frame size too small: {} (minimum: {} header bytes)",
                self.max_frame_size,
                crate::p2p::wire::HEADER_SIZE
            ));
        } else if self.max_frame_size < self.max_chunk_size {
            errors.push("Max frame size cannot be smaller than max chunk size".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("msnp_wire"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
