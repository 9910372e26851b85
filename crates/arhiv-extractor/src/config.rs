//! Configuration for the Extractor

use arhiv_stream::ExtractorOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum normalised text length (characters)
    pub min_text_length: usize,

    /// Maximum normalised text length (characters)
    pub max_text_length: usize,

    /// Maximum time for the whole model stream (seconds)
    pub stream_timeout_secs: u64,

    /// Maximum time until the model starts streaming (seconds)
    pub connect_timeout_secs: u64,

    /// Show an empty row for records that have no complete field yet
    pub emit_placeholders: bool,
}

impl ExtractorConfig {
    /// Get the stream timeout as a Duration
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    /// Get the connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Options for the incremental record extractor
    pub fn extractor_options(&self) -> ExtractorOptions {
        ExtractorOptions {
            emit_placeholders: self.emit_placeholders,
            ..ExtractorOptions::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.min_text_length > self.max_text_length {
            return Err("min_text_length cannot exceed max_text_length".to_string());
        }
        if self.stream_timeout_secs == 0 {
            return Err("stream_timeout_secs must be greater than 0".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".to_string());
        }
        if self.connect_timeout_secs > self.stream_timeout_secs {
            return Err("connect_timeout_secs cannot exceed stream_timeout_secs".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration matching the hosted deployment limits
    fn default() -> Self {
        Self {
            min_text_length: 50,
            max_text_length: 500_000,
            stream_timeout_secs: 60,
            connect_timeout_secs: 30,
            emit_placeholders: false,
        }
    }
}

impl ExtractorConfig {
    /// Lenient preset: long documents and slow models
    pub fn lenient() -> Self {
        Self {
            min_text_length: 1,
            max_text_length: 2_000_000,
            stream_timeout_secs: 600,
            connect_timeout_secs: 120,
            emit_placeholders: true,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
