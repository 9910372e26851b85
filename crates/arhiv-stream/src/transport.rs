//! Chunk transport events and the async driver loop

use crate::error::StreamError;
use crate::session::StreamSession;
use arhiv_domain::traits::RenderSink;
use arhiv_domain::{Record, StreamOutcome};
use tokio::sync::mpsc;
use tracing::warn;

/// One event delivered by the transport, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// New text to append to the buffer
    Delta(String),
    /// The entire text accumulated so far (replaces, never appends)
    Snapshot(String),
    /// No more fragments will arrive
    Complete(Completion),
    /// The transport failed; no more fragments will arrive
    Error(String),
}

/// Payload of terminal completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The producer strict-parsed the final document
    Parsed(Vec<Record>),
    /// The producer could not strict-parse the final document
    ParseFailed(String),
    /// The session should strict-parse its own buffer
    Deferred,
}

/// Message used when a channel closes without a terminal event
pub const STREAM_ENDED_EARLY: &str = "stream ended before completion";

/// Feed events from `events` into `session` until the operation ends.
///
/// This is the only suspension point of the core: each event is processed to
/// completion before the next one is awaited. A channel that closes without a
/// terminal event counts as a transport failure.
pub async fn drive<S: RenderSink>(
    session: &mut StreamSession<S>,
    events: &mut mpsc::Receiver<TransportEvent>,
) -> Result<StreamOutcome, StreamError> {
    while let Some(event) = events.recv().await {
        if let Some(outcome) = session.handle(event)? {
            return Ok(outcome);
        }
    }

    warn!(chunks = session.chunk_count(), "transport closed without completion");
    session.on_error(STREAM_ENDED_EARLY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arhiv_domain::traits::CollectingSink;
    use arhiv_domain::StreamStatus;

    #[tokio::test]
    async fn test_drive_to_completion() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(TransportEvent::Delta(r#"{"records":[{"a":"1"}"#.to_string())).await.unwrap();
        tx.send(TransportEvent::Delta("]}".to_string())).await.unwrap();
        tx.send(TransportEvent::Complete(Completion::Deferred)).await.unwrap();

        let mut session = StreamSession::new(CollectingSink::default());
        let outcome = drive(&mut session, &mut rx).await.unwrap();

        assert_eq!(outcome.status, StreamStatus::Complete);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_channel_is_a_transport_error() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(TransportEvent::Delta(r#"{"records":[{"a":"1"},"#.to_string())).await.unwrap();
        drop(tx);

        let mut session = StreamSession::new(CollectingSink::default());
        let outcome = drive(&mut session, &mut rx).await.unwrap();

        assert_eq!(
            outcome.status,
            StreamStatus::Failed {
                message: STREAM_ENDED_EARLY.to_string()
            }
        );
        // Partial results are not retracted
        assert_eq!(outcome.records.len(), 1);
    }
}
