//! Error types for the streaming core

use thiserror::Error;

/// Errors surfaced by the streaming core.
///
/// Parse divergences on the degraded path are never errors; they only show
/// up here once a strict, authoritative parse is requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Strict JSON parse failed
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON was valid but not of the expected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// An event arrived after the operation reached a terminal state
    #[error("Stream already finished ({0})")]
    Closed(String),

    /// A wire envelope could not be decoded
    #[error("Invalid envelope: {0}")]
    Envelope(String),

    /// The wire carried bytes that are not UTF-8
    #[error("Invalid UTF-8 in stream: {0}")]
    Utf8(String),
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::InvalidJson(e.to_string())
    }
}

impl From<std::str::Utf8Error> for StreamError {
    fn from(e: std::str::Utf8Error) -> Self {
        StreamError::Utf8(e.to_string())
    }
}
