//! Arhiv Extractor
//!
//! Turns an uploaded document into archival records through a streaming LLM.
//!
//! # Architecture
//!
//! ```text
//! Document → FileTextReader → normalise → PromptBuilder → StreamingProvider
//!          → StreamSession (incremental records) → RenderSink
//! ```
//!
//! # Key Features
//!
//! - **Document Reading**: plain text, PDF, DOCX and a lossy `.doc` fallback
//! - **Early Rejection**: unsupported and too-short documents fail before any model call
//! - **Live Records**: every model fragment re-renders the best-known record list
//! - **Authoritative Finish**: the completed response is strict-parsed and replaces the approximation
//!
//! # Example Usage
//!
//! ```
//! use arhiv_domain::traits::CollectingSink;
//! use arhiv_domain::Document;
//! use arhiv_extractor::{ExtractionRequest, Extractor};
//! use arhiv_llm::MockProvider;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::from_text(r#"{"records":[{"naslov":"Matične knjige"}]}"#, 8);
//! let extractor = Extractor::with_defaults(llm);
//!
//! let text = "Popis arhivskog gradiva Državnog arhiva u Varaždinu, fond matičnih knjiga.";
//! let document = Document::new("popis.txt", "text/plain", text.as_bytes().to_vec());
//!
//! let mut sink = CollectingSink::default();
//! let outcome = extractor.extract(&ExtractionRequest::new(document), &mut sink).await?;
//!
//! assert!(outcome.is_final());
//! assert_eq!(outcome.records[0].get("naslov"), Some("Matične knjige"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod prompt;
mod reader;
mod types;

pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use prompt::PromptBuilder;
pub use reader::{normalize_text, DocumentKind, FileTextReader, DOCX_MEDIA_TYPE};
pub use types::{ExtractionMetadata, ExtractionOutcome, ExtractionRequest, PreparedDocument};
