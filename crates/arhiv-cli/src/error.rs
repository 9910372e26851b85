//! Error types for the CLI application.

use arhiv_extractor::ExtractorError;
use arhiv_llm::LlmError;
use arhiv_stream::StreamError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction pipeline error
    #[error("{0}")]
    Extractor(#[from] ExtractorError),

    /// Model provider error
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// Stream decoding error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
