//! Error types for the Extractor

use arhiv_llm::LlmError;
use arhiv_stream::StreamError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Neither the media type nor the file extension is readable
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// The document could not be turned into text
    #[error("Failed to read document: {0}")]
    DocumentRead(String),

    /// Normalised text is below the minimum length
    #[error("Document appears empty or too short.")]
    TextTooShort(usize, usize),

    /// Normalised text exceeds the maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// A deadline passed
    #[error("Extraction timed out after {0}s")]
    Timeout(u64),

    /// Streaming core error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// True for problems with the uploaded document itself
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractorError::UnsupportedFormat(_)
                | ExtractorError::DocumentRead(_)
                | ExtractorError::TextTooShort(..)
                | ExtractorError::TextTooLong(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ExtractorError::TextTooShort(3, 50).to_string(),
            "Document appears empty or too short."
        );
        assert_eq!(
            ExtractorError::UnsupportedFormat("image/png".into()).to_string(),
            "Unsupported file type: image/png"
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(ExtractorError::TextTooLong(10, 5).is_client_error());
        assert!(!ExtractorError::Timeout(5).is_client_error());
        assert!(!ExtractorError::from(LlmError::RateLimitExceeded).is_client_error());
    }
}
