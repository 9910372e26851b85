//! Configuration file parsing for the parse service.
//!
//! Loads settings from TOML files including bind address, SSE framing,
//! the model provider and the extraction limits.

use arhiv_extractor::ExtractorConfig;
use arhiv_llm::openrouter::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REFERER, DEFAULT_TITLE};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding the attribution referer
pub const SITE_URL_ENV: &str = "SITE_URL";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// The API key variable is unset or empty
    #[error("API key not set: environment variable {0} is empty")]
    MissingApiKey(String),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How model output is relayed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Every frame carries the whole response so far (`content`)
    #[default]
    Snapshot,
    /// Every frame carries only the new fragment (`delta`)
    Delta,
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 3000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SSE framing (default: snapshot)
    #[serde(default)]
    pub framing: Framing,

    /// Largest accepted request body in bytes (default: 25 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Extraction limits
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// OpenRouter connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Referer sent for attribution; falls back to `SITE_URL`
    pub site_url: Option<String>,

    /// Application title sent for attribution
    pub title: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: API_KEY_ENV.to_string(),
            site_url: None,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey(self.api_key_env.clone())),
        }
    }

    /// Referer header value
    pub fn referer(&self) -> String {
        self.site_url
            .clone()
            .or_else(|| std::env::var(SITE_URL_ENV).ok().filter(|url| !url.is_empty()))
            .unwrap_or_else(|| DEFAULT_REFERER.to_string())
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::MissingField("bind_address".to_string()));
        }
        if self.provider.model.is_empty() {
            return Err(ConfigError::MissingField("provider.model".to_string()));
        }
        if self.provider.base_url.is_empty() {
            return Err(ConfigError::MissingField("provider.base_url".to_string()));
        }
        if self.provider.api_key_env.is_empty() {
            return Err(ConfigError::MissingField("provider.api_key_env".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        self.extractor.validate().map_err(ConfigError::Invalid)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            framing: Framing::Snapshot,
            max_upload_bytes: default_max_upload_bytes(),
            provider: ProviderConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
