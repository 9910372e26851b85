//! Request and response types for extraction

use arhiv_domain::{Document, Record, StreamStatus};
use arhiv_llm::ChatRequest;
use serde::{Deserialize, Serialize};

/// Request to extract archival records from a document
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// The uploaded document
    pub document: Document,
}

impl ExtractionRequest {
    /// Wrap a document
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

/// A document that passed reading and length checks, ready for the model
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Source label (the file name)
    pub source: String,

    /// Normalised document text
    pub text: String,

    /// Prompts built from `text`
    pub chat: ChatRequest,
}

impl PreparedDocument {
    /// Length of the normalised text in characters
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Result of an extraction operation
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Records visible when the operation ended
    pub records: Vec<Record>,

    /// How the operation ended
    pub status: StreamStatus,

    /// Metadata about the extraction
    pub metadata: ExtractionMetadata,
}

impl ExtractionOutcome {
    /// True only for an authoritative, strict-parsed result
    pub fn is_final(&self) -> bool {
        self.status == StreamStatus::Complete
    }
}

/// Metadata about an extraction operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Source document
    pub source: String,

    /// Model used for extraction
    pub model_name: String,

    /// Number of fragments received from the model
    pub chunk_count: usize,

    /// Normalised document length (characters)
    pub text_length: usize,

    /// Model response length (bytes)
    pub response_length: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
