//! Arhiv Streaming Parser
//!
//! Turns a growing, possibly truncated JSON text into the best-known list of
//! archival records, so results can be shown while the model is still writing.
//!
//! # Architecture
//!
//! - [`scanner`]: byte-level string/escape state shared by every pass
//! - [`extract_records`] / [`IncrementalExtractor`]: locate the records array
//!   and split it into record spans; resumes from a checkpoint when the buffer
//!   only grew
//! - [`reconcile`]: recover complete pairs from an unparseable record span
//! - [`StreamSession`]: buffer, extractor and render sink for one upload
//! - [`drive`]: async loop feeding transport events into a session
//! - [`Envelope`] / [`SseDecoder`]: the server-sent event wire format
//!
//! The extractor never fails: every input, however malformed, yields either
//! records or [`Extraction::Empty`](arhiv_domain::Extraction::Empty).
//!
//! # Examples
//!
//! ```
//! use arhiv_domain::traits::CollectingSink;
//! use arhiv_stream::{Completion, StreamSession};
//!
//! let mut session = StreamSession::new(CollectingSink::default());
//! session.on_delta(r#"{"records":[{"id":"1"},{"id":"2","ti"#).unwrap();
//! assert_eq!(session.records().len(), 2);
//!
//! session.on_delta(r#"tle":"Beta"}]}"#).unwrap();
//! let outcome = session.on_complete(Completion::Deferred).unwrap();
//! assert!(outcome.is_final());
//! assert_eq!(outcome.records[1].get("title"), Some("Beta"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod extractor;
pub mod reconcile;
pub mod scanner;
pub mod session;
pub mod transport;
pub mod value;
pub mod wire;

pub use error::StreamError;
pub use extractor::{extract_records, extract_records_with, ExtractorOptions, IncrementalExtractor};
pub use reconcile::reconcile;
pub use session::StreamSession;
pub use transport::{drive, Completion, TransportEvent, STREAM_ENDED_EARLY};
pub use value::{parse_document, parse_document_with_key, record_from_value, records_from_values, RECORDS_KEY};
pub use wire::{Envelope, ErrorStage, SseDecoder};
