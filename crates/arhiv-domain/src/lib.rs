//! Arhiv Domain Layer
//!
//! Core vocabulary shared by every other Arhiv crate: the archival [`Record`],
//! the result of one extraction pass, the archival field schema and the trait
//! boundaries towards document readers and render sinks.
//!
//! ## Key Concepts
//!
//! - **Record**: an opaque mapping of named string fields. Records carry no
//!   identity beyond their position in an emitted list.
//! - **Extraction**: the best-known record list for one buffer snapshot, or
//!   `Empty` when nothing is identifiable yet.
//! - **Stream outcome**: the terminal state of one streaming operation.
//!
//! ## Architecture
//!
//! This crate holds no I/O and no parsing. Infrastructure implementations
//! (readers, model providers, the streaming parser) live in other crates and
//! meet here through the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod extraction;
pub mod record;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use document::Document;
pub use extraction::{Extraction, StreamOutcome, StreamStatus};
pub use record::Record;
pub use schema::{FieldSpec, ARCHIVAL_FIELDS};
