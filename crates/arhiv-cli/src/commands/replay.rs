//! Replay command implementation.
//!
//! Reads a recorded `text/event-stream` body, as written by the parse
//! service, and runs it through the same session the live pipeline uses.

use crate::cli::ReplayArgs;
use crate::commands::show_results;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::sink::TerminalSink;
use arhiv_domain::traits::RenderSink;
use arhiv_domain::StreamOutcome;
use arhiv_stream::{drive, Envelope, SseDecoder, StreamSession, TransportEvent};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Bytes read from the recording per step
const READ_CHUNK: usize = 4096;

/// Events buffered between the reader and the session
const EVENT_BUFFER: usize = 64;

/// Execute the replay command.
pub async fn execute_replay(args: ReplayArgs, formatter: &Formatter, progress: bool) -> Result<()> {
    let mut sink = TerminalSink::stderr(formatter.color_enabled());
    if !progress {
        sink = sink.quiet();
    }

    let outcome = replay_file(&args.file, Duration::from_millis(args.pace_ms), &mut sink).await?;
    show_results(&outcome.records, &outcome.status, &args.view, formatter)
}

/// Replay the recording at `path` into `sink`.
pub async fn replay_file<S: RenderSink>(path: &Path, pace: Duration, sink: S) -> Result<StreamOutcome> {
    let file = File::open(path).await?;
    replay(file, pace, sink).await
}

/// Replay any byte source holding SSE frames into `sink`.
///
/// A recording that ends without a terminal frame finishes as a failed
/// stream that keeps its partial records.
pub async fn replay<R, S>(source: R, pace: Duration, sink: S) -> Result<StreamOutcome>
where
    R: AsyncRead + Unpin + Send + 'static,
    S: RenderSink,
{
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let reader = tokio::spawn(feed(source, tx, pace));

    let mut session = StreamSession::new(sink);
    let outcome = drive(&mut session, &mut rx).await?;
    // Closing the channel stops a reader that is still going
    drop(rx);

    reader.await.map_err(|e| CliError::Io(io::Error::other(e)))??;
    Ok(outcome)
}

/// Decode frames from `source` and forward them as transport events.
async fn feed<R>(mut source: R, events: mpsc::Sender<TransportEvent>, pace: Duration) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = SseDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = source.read(&mut buf).await?;
        let payloads = if n == 0 {
            decoder.finish()?.into_iter().collect()
        } else {
            decoder.push(&buf[..n])?
        };

        for payload in payloads {
            let event = match Envelope::parse(&payload) {
                Ok(envelope) => envelope.into_event(),
                Err(e) => TransportEvent::Error(e.to_string()),
            };
            let terminal = !matches!(event, TransportEvent::Delta(_) | TransportEvent::Snapshot(_));

            if events.send(event).await.is_err() || terminal {
                return Ok(());
            }
            if !pace.is_zero() {
                tokio::time::sleep(pace).await;
            }
        }

        if n == 0 {
            debug!(pending = decoder.pending_len(), "recording ended without a terminal frame");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arhiv_domain::traits::CollectingSink;
    use arhiv_domain::StreamStatus;
    use arhiv_stream::STREAM_ENDED_EARLY;

    fn recording(frames: &[Envelope]) -> Vec<u8> {
        frames
            .iter()
            .map(|f| f.to_sse_frame().unwrap())
            .collect::<String>()
            .into_bytes()
    }

    #[tokio::test]
    async fn test_replay_complete_stream() {
        let body = recording(&[
            Envelope::content(r#"{"records":[{"naslov":"Fond"},"#),
            Envelope::content(r#"{"records":[{"naslov":"Fond"},{"naslov":"Ser"#),
            Envelope::complete(&[
                [("naslov", "Fond")].into_iter().collect(),
                [("naslov", "Serija")].into_iter().collect(),
            ]),
        ]);

        let mut sink = CollectingSink::default();
        let outcome = replay(io::Cursor::new(body), Duration::ZERO, &mut sink).await.unwrap();

        assert_eq!(outcome.status, StreamStatus::Complete);
        assert_eq!(outcome.records[1].get("naslov"), Some("Serija"));
        assert_eq!(sink.updates[0].len(), 1);
        assert_eq!(sink.current(), outcome.records.as_slice());
    }

    #[tokio::test]
    async fn test_truncated_recording_keeps_partials() {
        let body = recording(&[Envelope::content(r#"{"records":[{"naslov":"Fond"},{"nas"#)]);

        let outcome = replay(io::Cursor::new(body), Duration::ZERO, CollectingSink::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.status,
            StreamStatus::Failed {
                message: STREAM_ENDED_EARLY.to_string()
            }
        );
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_garbled_frame_is_a_transport_error() {
        let mut body = recording(&[Envelope::content(r#"{"records":[{"naslov":"Fond"}"#)]);
        body.extend_from_slice(b"data: {not json}\n\n");

        let outcome = replay(io::Cursor::new(body), Duration::ZERO, CollectingSink::default())
            .await
            .unwrap();

        assert!(matches!(outcome.status, StreamStatus::Failed { .. }));
        assert_eq!(outcome.records.len(), 1);
    }
}
