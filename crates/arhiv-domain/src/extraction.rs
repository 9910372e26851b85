//! Extraction results and stream outcomes

use crate::Record;
use std::fmt;

/// The best-known record list for one buffer snapshot.
///
/// A zero-length list is never represented as `Records(vec![])`; use
/// [`Extraction::from_records`] to get the normalised form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extraction {
    /// One or more records, complete or partial, in source order
    Records(Vec<Record>),
    /// Nothing identifiable yet
    #[default]
    Empty,
}

impl Extraction {
    /// Build an extraction, mapping an empty list to [`Extraction::Empty`]
    ///
    /// # Examples
    ///
    /// ```
    /// use arhiv_domain::Extraction;
    ///
    /// assert_eq!(Extraction::from_records(Vec::new()), Extraction::Empty);
    /// ```
    pub fn from_records(records: Vec<Record>) -> Self {
        if records.is_empty() {
            Extraction::Empty
        } else {
            Extraction::Records(records)
        }
    }

    /// Borrow the records (empty slice for `Empty`)
    pub fn records(&self) -> &[Record] {
        match self {
            Extraction::Records(records) => records,
            Extraction::Empty => &[],
        }
    }

    /// Take the records out (empty vec for `Empty`)
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Extraction::Records(records) => records,
            Extraction::Empty => Vec::new(),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// True for `Empty`
    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty)
    }
}

/// Where a streaming operation stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// Fragments are still arriving
    Streaming,
    /// Terminal completion with an authoritative, strict-parsed result
    Complete,
    /// The stream finished but its text never became valid JSON.
    /// The last incremental approximation stays visible.
    Incomplete {
        /// Why the final parse failed
        reason: String,
    },
    /// The transport failed before completion
    Failed {
        /// Human-readable transport error
        message: String,
    },
    /// The operation was abandoned by its owner
    Cancelled,
}

impl StreamStatus {
    /// True for every state except `Streaming`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamStatus::Streaming)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Streaming => write!(f, "streaming"),
            StreamStatus::Complete => write!(f, "complete"),
            StreamStatus::Incomplete { reason } => write!(f, "extraction incomplete: {}", reason),
            StreamStatus::Failed { message } => write!(f, "failed: {}", message),
            StreamStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final state of one streaming operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Records visible when the operation ended
    pub records: Vec<Record>,
    /// How the operation ended
    pub status: StreamStatus,
}

impl StreamOutcome {
    /// True only when the records are the authoritative final result
    pub fn is_final(&self) -> bool {
        self.status == StreamStatus::Complete
    }
}
