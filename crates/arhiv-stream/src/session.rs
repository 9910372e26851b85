//! One streaming operation: buffer, extractor and render sink
//!
//! The session is the consumer side of the chunk transport. It owns the
//! append-only buffer for a single upload, re-runs the extractor after every
//! fragment and pushes full snapshots to the render sink. On terminal
//! completion the strict-parsed payload replaces whatever the incremental
//! extractor last approximated.

use crate::error::StreamError;
use crate::extractor::{ExtractorOptions, IncrementalExtractor};
use crate::transport::{Completion, TransportEvent};
use crate::value::parse_document_with_key;
use arhiv_domain::traits::RenderSink;
use arhiv_domain::{Record, StreamOutcome, StreamStatus};
use tracing::{debug, info, warn};

/// Streaming state for one upload
#[derive(Debug)]
pub struct StreamSession<S: RenderSink> {
    buffer: String,
    extractor: IncrementalExtractor,
    sink: S,
    rendered: Vec<Record>,
    status: StreamStatus,
    chunk_count: usize,
}

impl<S: RenderSink> StreamSession<S> {
    /// Create a session rendering into `sink`
    pub fn new(sink: S) -> Self {
        Self::with_options(sink, ExtractorOptions::default())
    }

    /// Create a session with custom extractor options
    pub fn with_options(sink: S, options: ExtractorOptions) -> Self {
        Self {
            buffer: String::new(),
            extractor: IncrementalExtractor::with_options(options),
            sink,
            rendered: Vec::new(),
            status: StreamStatus::Streaming,
            chunk_count: 0,
        }
    }

    /// Accumulated text so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Records currently displayed
    pub fn records(&self) -> &[Record] {
        &self.rendered
    }

    /// Current state of the operation
    pub fn status(&self) -> &StreamStatus {
        &self.status
    }

    /// Number of fragments processed
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Borrow the render sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the render sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Append an incremental fragment and re-extract
    pub fn on_delta(&mut self, fragment: &str) -> Result<&[Record], StreamError> {
        self.ensure_streaming()?;
        self.buffer.push_str(fragment);
        self.after_chunk();
        Ok(&self.rendered)
    }

    /// Accept a cumulative snapshot of everything produced so far.
    ///
    /// A snapshot that extends the buffer only contributes its new suffix, so
    /// restated text is never duplicated. One that does not extend it replaces
    /// the buffer outright.
    pub fn on_snapshot(&mut self, cumulative: &str) -> Result<&[Record], StreamError> {
        self.ensure_streaming()?;
        match cumulative.strip_prefix(self.buffer.as_str()) {
            Some(suffix) => self.buffer.push_str(suffix),
            None => {
                warn!(
                    buffered = self.buffer.len(),
                    snapshot = cumulative.len(),
                    "snapshot does not extend the buffer, replacing it"
                );
                self.buffer.clear();
                self.buffer.push_str(cumulative);
                self.extractor.reset();
            }
        }
        self.after_chunk();
        Ok(&self.rendered)
    }

    /// Terminal completion: the authoritative result replaces the approximation
    pub fn on_complete(&mut self, completion: Completion) -> Result<StreamOutcome, StreamError> {
        self.ensure_streaming()?;

        let parsed = match completion {
            Completion::Parsed(records) => Ok(records),
            Completion::ParseFailed(reason) => Err(reason),
            Completion::Deferred => {
                parse_document_with_key(&self.buffer, &self.extractor.options().records_key)
                    .map_err(|e| e.to_string())
            }
        };

        match parsed {
            Ok(records) => {
                info!(
                    records = records.len(),
                    chunks = self.chunk_count,
                    chars = self.buffer.len(),
                    "stream complete"
                );
                self.rendered = records;
                self.sink.update(&self.rendered);
                self.status = StreamStatus::Complete;
            }
            Err(reason) => {
                warn!(%reason, kept = self.rendered.len(), "final parse failed, keeping partial records");
                self.status = StreamStatus::Incomplete { reason };
            }
        }

        Ok(self.finish())
    }

    /// Transport failure: keep what was rendered, mark it non-final
    pub fn on_error(&mut self, message: impl Into<String>) -> Result<StreamOutcome, StreamError> {
        self.ensure_streaming()?;
        let message = message.into();
        warn!(%message, kept = self.rendered.len(), "transport failed");
        self.status = StreamStatus::Failed { message };
        Ok(self.finish())
    }

    /// Dispatch a transport event; returns the outcome once terminal
    pub fn handle(&mut self, event: TransportEvent) -> Result<Option<StreamOutcome>, StreamError> {
        match event {
            TransportEvent::Delta(fragment) => self.on_delta(&fragment).map(|_| None),
            TransportEvent::Snapshot(text) => self.on_snapshot(&text).map(|_| None),
            TransportEvent::Complete(completion) => self.on_complete(completion).map(Some),
            TransportEvent::Error(message) => self.on_error(message).map(Some),
        }
    }

    /// Abandon the operation and release the buffer
    pub fn cancel(&mut self) -> StreamOutcome {
        if !self.status.is_terminal() {
            debug!(chunks = self.chunk_count, "stream cancelled");
            self.status = StreamStatus::Cancelled;
        }
        self.buffer = String::new();
        self.extractor.reset();
        StreamOutcome {
            records: self.rendered.clone(),
            status: self.status.clone(),
        }
    }

    /// Discard everything and get ready for a new operation
    pub fn reset(&mut self) {
        self.buffer = String::new();
        self.extractor.reset();
        self.rendered.clear();
        self.status = StreamStatus::Streaming;
        self.chunk_count = 0;
    }

    fn ensure_streaming(&self) -> Result<(), StreamError> {
        if self.status.is_terminal() {
            return Err(StreamError::Closed(self.status.to_string()));
        }
        Ok(())
    }

    fn after_chunk(&mut self) {
        self.chunk_count += 1;
        let extraction = self.extractor.extract(&self.buffer);

        // Nothing renderable yet leaves the previous view alone
        if extraction.is_empty() {
            return;
        }

        self.rendered = extraction.into_records();
        self.sink.update(&self.rendered);

        if self.chunk_count % 20 == 0 {
            debug!(
                chunks = self.chunk_count,
                records = self.rendered.len(),
                chars = self.buffer.len(),
                "stream progress"
            );
        }
    }

    fn finish(&mut self) -> StreamOutcome {
        let outcome = StreamOutcome {
            records: self.rendered.clone(),
            status: self.status.clone(),
        };
        self.sink.finish(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arhiv_domain::traits::CollectingSink;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn session() -> StreamSession<CollectingSink> {
        StreamSession::new(CollectingSink::default())
    }

    #[test]
    fn test_deltas_accumulate() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"#).unwrap();
        assert!(session.records().is_empty());
        assert!(session.sink().updates.is_empty());

        session.on_delta(r#""1","b":"x"#).unwrap();
        assert_eq!(session.records(), &[rec(&[("a", "1")])]);
        assert_eq!(session.buffer(), r#"{"records":[{"a":"1","b":"x"#);
        assert_eq!(session.chunk_count(), 2);
    }

    #[test]
    fn test_snapshots_are_not_duplicated() {
        let mut session = session();
        session.on_snapshot(r#"{"records":[{"a":"1"}"#).unwrap();
        session.on_snapshot(r#"{"records":[{"a":"1"},{"a":"2"}"#).unwrap();
        assert_eq!(session.buffer(), r#"{"records":[{"a":"1"},{"a":"2"}"#);
        assert_eq!(session.records().len(), 2);
    }

    #[test]
    fn test_diverging_snapshot_replaces_buffer() {
        let mut session = session();
        session.on_snapshot(r#"{"records":[{"a":"1"}"#).unwrap();
        session.on_snapshot(r#"{"records":[{"z":"9"}"#).unwrap();
        assert_eq!(session.records(), &[rec(&[("z", "9")])]);
    }

    #[test]
    fn test_parsed_completion_overrides() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"1"},{"b":"2"}"#).unwrap();
        let outcome = session
            .on_complete(Completion::Parsed(vec![rec(&[("final", "yes")])]))
            .unwrap();

        assert!(outcome.is_final());
        assert_eq!(outcome.records, vec![rec(&[("final", "yes")])]);
        assert_eq!(session.sink().current(), &[rec(&[("final", "yes")])]);
        assert_eq!(session.sink().outcome.as_ref(), Some(&outcome));
    }

    #[test]
    fn test_deferred_completion_parses_buffer() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"1"}]}"#).unwrap();
        let outcome = session.on_complete(Completion::Deferred).unwrap();
        assert_eq!(outcome.status, StreamStatus::Complete);
        assert_eq!(outcome.records, vec![rec(&[("a", "1")])]);
    }

    #[test]
    fn test_failed_final_parse_keeps_partials() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"1"},{"b":"2"#).unwrap();
        let outcome = session.on_complete(Completion::Deferred).unwrap();

        assert!(matches!(outcome.status, StreamStatus::Incomplete { .. }));
        assert_eq!(outcome.records, vec![rec(&[("a", "1")])]);
        assert!(!outcome.is_final());
    }

    #[test]
    fn test_transport_error_before_content_shows_nothing() {
        let mut session = session();
        let outcome = session.on_error("connection refused").unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.status,
            StreamStatus::Failed {
                message: "connection refused".to_string()
            }
        );
    }

    #[test]
    fn test_events_after_terminal_are_rejected() {
        let mut session = session();
        session.on_error("boom").unwrap();
        assert!(matches!(session.on_delta("x"), Err(StreamError::Closed(_))));
        assert!(matches!(
            session.on_complete(Completion::Deferred),
            Err(StreamError::Closed(_))
        ));
    }

    #[test]
    fn test_cancel_releases_buffer() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"1"}"#).unwrap();
        let outcome = session.cancel();
        assert_eq!(outcome.status, StreamStatus::Cancelled);
        assert!(session.buffer().is_empty());
        assert!(session.on_delta("more").is_err());
    }

    #[test]
    fn test_reset_starts_a_new_operation() {
        let mut session = session();
        session.on_delta(r#"{"records":[{"a":"1"}]}"#).unwrap();
        session.on_complete(Completion::Deferred).unwrap();

        session.reset();
        assert_eq!(session.status(), &StreamStatus::Streaming);
        assert!(session.records().is_empty());
        session.on_delta(r#"{"records":[{"b":"2"}"#).unwrap();
        assert_eq!(session.records(), &[rec(&[("b", "2")])]);
    }

    #[test]
    fn test_handle_dispatch() {
        let mut session = session();
        assert_eq!(session.handle(TransportEvent::Delta("{".into())).unwrap(), None);
        let outcome = session.handle(TransportEvent::Error("x".into())).unwrap();
        assert!(outcome.is_some());
    }
}
