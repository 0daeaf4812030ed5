//! # Configuration Management
//!
//! Centralized configuration for decoders and radio channels.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`, read from the
//!   `TELEMETRY_PROTOCOL_*` variables:
//!   `TELEMETRY_PROTOCOL_BUFFER_CAPACITY`, `TELEMETRY_PROTOCOL_MAX_BODY_SIZE`,
//!   `TELEMETRY_PROTOCOL_CHANNEL_COUNT` and `TELEMETRY_PROTOCOL_FRAME_SIZE`
//!   (unset or unparsable values keep the defaults)

use crate::core::header::UDP_MAX_BODY_LEN;
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default number of radio channels
pub const DEFAULT_CHANNEL_COUNT: usize = 8;

/// Default size of one channel frame in bytes
pub const DEFAULT_FRAME_SIZE: usize = 4;

/// Default initial capacity of a decoder buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Stream decoder configuration
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Radio channel configuration
    #[serde(default)]
    pub channels: ChannelConfig,
}

impl ProtocolConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("TELEMETRY_PROTOCOL_BUFFER_CAPACITY") {
            if let Ok(val) = capacity.parse::<usize>() {
                config.decoder.buffer_capacity = val;
            }
        }

        if let Ok(max_body) = std::env::var("TELEMETRY_PROTOCOL_MAX_BODY_SIZE") {
            if let Ok(val) = max_body.parse::<usize>() {
                config.decoder.max_body_size = val;
            }
        }

        if let Ok(count) = std::env::var("TELEMETRY_PROTOCOL_CHANNEL_COUNT") {
            if let Ok(val) = count.parse::<usize>() {
                config.channels.channel_count = val;
            }
        }

        if let Ok(size) = std::env::var("TELEMETRY_PROTOCOL_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.channels.frame_size = val;
            }
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
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.decoder.validate());
        errors.extend(self.channels.validate());
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

/// Stream decoder configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Initial capacity of the reassembly buffer
    pub buffer_capacity: usize,

    /// Largest body accepted before a frame is rejected as malformed
    pub max_body_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_body_size: UDP_MAX_BODY_LEN,
        }
    }
}

impl DecoderConfig {
    /// Validate decoder configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.buffer_capacity == 0 {
            errors.push("Buffer capacity must be greater than 0".to_string());
        } else if self.buffer_capacity > 16 * 1024 * 1024 {
            errors.push(format!(
                "Buffer capacity too large: {} bytes (maximum: 16 MB)",
                self.buffer_capacity
            ));
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        } else if self.max_body_size > UDP_MAX_BODY_LEN {
            errors.push(format!(
                "Max body size too large: {} bytes (maximum: {UDP_MAX_BODY_LEN})",
                self.max_body_size
            ));
        }

        errors
    }
}

/// Radio channel configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Number of independent channels
    pub channel_count: usize,

    /// Exact size of every frame written to a channel
    pub frame_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_count: DEFAULT_CHANNEL_COUNT,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

impl ChannelConfig {
    /// Validate channel configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.channel_count == 0 {
            errors.push("Channel count must be greater than 0".to_string());
        } else if self.channel_count > 256 {
            errors.push(format!(
                "Channel count too large: {} (maximum: 256)",
                self.channel_count
            ));
        }

        if self.frame_size == 0 {
            errors.push("Frame size must be greater than 0".to_string());
        } else if self.frame_size > UDP_MAX_BODY_LEN {
            errors.push(format!(
                "Frame size too large: {} bytes (maximum: {UDP_MAX_BODY_LEN})",
                self.frame_size
            ));
        }

        errors
    }
}
