//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the streaming core and the
//! collaborators around it. Implementations live in other crates.

use crate::{Document, Record, StreamOutcome};

/// Consumer of extraction snapshots
///
/// Every `update` carries the complete current record list, never a delta;
/// the last call wins. Implemented by the terminal renderer (arhiv-cli) and
/// by test collectors.
pub trait RenderSink {
    /// Replace the displayed records with `records`
    fn update(&mut self, records: &[Record]);

    /// Called once when the operation reaches a terminal state
    fn finish(&mut self, _outcome: &StreamOutcome) {}
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn update(&mut self, records: &[Record]) {
        (**self).update(records)
    }

    fn finish(&mut self, outcome: &StreamOutcome) {
        (**self).finish(outcome)
    }
}

/// A render sink that keeps every update, for tests and offline replays
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    /// Every list passed to `update`, in call order
    pub updates: Vec<Vec<Record>>,
    /// The terminal outcome, once reached
    pub outcome: Option<StreamOutcome>,
}

impl CollectingSink {
    /// The most recently displayed list
    pub fn current(&self) -> &[Record] {
        self.updates.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl RenderSink for CollectingSink {
    fn update(&mut self, records: &[Record]) {
        self.updates.push(records.to_vec());
    }

    fn finish(&mut self, outcome: &StreamOutcome) {
        self.outcome = Some(outcome.clone());
    }
}

/// Trait for turning an uploaded document into plain text
///
/// Implemented by the infrastructure layer (arhiv-extractor)
pub trait DocumentReader {
    /// Error type for read operations
    type Error;

    /// Extract the document's plain text
    fn extract_text(&self, document: &Document) -> Result<String, Self::Error>;
}
