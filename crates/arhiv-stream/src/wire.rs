//! Server-sent event wire format
//!
//! Each frame is `data: <json>\n\n` where the JSON is an [`Envelope`] tagged
//! by `type`. The same decoder reads both our own endpoint and the upstream
//! model provider's event stream.

use crate::error::StreamError;
use crate::transport::{Completion, TransportEvent};
use crate::value::records_from_values;
use arhiv_domain::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of the pipeline produced an error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    /// The upstream stream or request failed
    Transport,
    /// The stream finished but its text did not parse
    Parse,
}

/// One message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Cumulative text produced so far
    Content {
        /// Everything streamed up to this point
        content: String,
        /// Always false
        #[serde(default)]
        done: bool,
    },
    /// Only the newly produced text
    Delta {
        /// Text appended since the previous frame
        delta: String,
        /// Always false
        #[serde(default)]
        done: bool,
    },
    /// Final strict-parsed records
    Complete {
        /// Record objects
        records: Vec<Value>,
        /// Always true
        #[serde(default = "done_true")]
        done: bool,
    },
    /// Terminal error
    Error {
        /// Human-readable message
        error: String,
        /// Always true
        #[serde(default = "done_true")]
        done: bool,
        /// Origin of the failure; absent means transport
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<ErrorStage>,
    },
}

fn done_true() -> bool {
    true
}

impl Envelope {
    /// Cumulative-content frame
    pub fn content(content: impl Into<String>) -> Self {
        Envelope::Content {
            content: content.into(),
            done: false,
        }
    }

    /// Incremental frame
    pub fn delta(delta: impl Into<String>) -> Self {
        Envelope::Delta {
            delta: delta.into(),
            done: false,
        }
    }

    /// Completion frame carrying the final records
    pub fn complete(records: &[Record]) -> Self {
        let records = records
            .iter()
            .map(|record| {
                Value::Object(
                    record
                        .iter()
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect(),
                )
            })
            .collect();
        Envelope::Complete {
            records,
            done: true,
        }
    }

    /// Upstream failure frame
    pub fn transport_error(error: impl Into<String>) -> Self {
        Envelope::Error {
            error: error.into(),
            done: true,
            stage: None,
        }
    }

    /// Final-parse failure frame
    pub fn parse_error(error: impl Into<String>) -> Self {
        Envelope::Error {
            error: error.into(),
            done: true,
            stage: Some(ErrorStage::Parse),
        }
    }

    /// Encode as one SSE frame
    pub fn to_sse_frame(&self) -> Result<String, StreamError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {}\n\n", json))
    }

    /// Decode the `data` payload of one frame
    pub fn parse(payload: &str) -> Result<Self, StreamError> {
        serde_json::from_str(payload).map_err(|e| StreamError::Envelope(e.to_string()))
    }

    /// Map onto the transport event the session consumes
    pub fn into_event(self) -> TransportEvent {
        match self {
            Envelope::Content { content, .. } => TransportEvent::Snapshot(content),
            Envelope::Delta { delta, .. } => TransportEvent::Delta(delta),
            Envelope::Complete { records, .. } => {
                TransportEvent::Complete(Completion::Parsed(records_from_values(&records)))
            }
            Envelope::Error {
                error,
                stage: Some(ErrorStage::Parse),
                ..
            } => TransportEvent::Complete(Completion::ParseFailed(error)),
            Envelope::Error { error, .. } => TransportEvent::Error(error),
        }
    }
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes may be split anywhere, including inside a multi-byte character; an
/// event is only decoded once its blank-line terminator has arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the `data` payload of every completed event
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, StreamError> {
        self.pending.extend(bytes.iter().copied().filter(|&b| b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = find_event_end(&self.pending) {
            let event: Vec<u8> = self.pending.drain(..end + 2).collect();
            if let Some(data) = event_data(&event[..end])? {
                payloads.push(data);
            }
        }
        Ok(payloads)
    }

    /// Flush a final event that was not followed by a blank line
    pub fn finish(&mut self) -> Result<Option<String>, StreamError> {
        let rest = std::mem::take(&mut self.pending);
        event_data(&rest)
    }

    /// Bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn find_event_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Join the `data:` lines of one event; comments and other fields are ignored
fn event_data(event: &[u8]) -> Result<Option<String>, StreamError> {
    let text = std::str::from_utf8(event)?;
    let mut data: Option<String> = None;

    for line in text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shapes() {
        assert_eq!(
            Envelope::content("{\"rec").to_sse_frame().unwrap(),
            "data: {\"type\":\"content\",\"content\":\"{\\\"rec\",\"done\":false}\n\n"
        );
        assert_eq!(
            Envelope::transport_error("boom").to_sse_frame().unwrap(),
            "data: {\"type\":\"error\",\"error\":\"boom\",\"done\":true}\n\n"
        );
        let parse = serde_json::to_value(Envelope::parse_error("Failed to parse JSON")).unwrap();
        assert_eq!(parse["stage"], "parse");
    }

    #[test]
    fn test_complete_frame_carries_records() {
        let record: Record = [("id", "1")].into_iter().collect();
        let value = serde_json::to_value(Envelope::complete(&[record])).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["done"], true);
        assert_eq!(value["records"][0]["id"], "1");
    }

    #[test]
    fn test_into_event() {
        let content = Envelope::parse(r#"{"type":"content","content":"abc","done":false}"#).unwrap();
        assert_eq!(content.into_event(), TransportEvent::Snapshot("abc".into()));

        let failed = Envelope::parse(r#"{"type":"error","error":"x","done":true}"#).unwrap();
        assert_eq!(failed.into_event(), TransportEvent::Error("x".into()));

        let unparsed =
            Envelope::parse(r#"{"type":"error","error":"bad","done":true,"stage":"parse"}"#).unwrap();
        assert_eq!(
            unparsed.into_event(),
            TransportEvent::Complete(Completion::ParseFailed("bad".into()))
        );

        let complete =
            Envelope::parse(r#"{"type":"complete","records":[{"a":"1"},7],"done":true}"#).unwrap();
        match complete.into_event() {
            TransportEvent::Complete(Completion::Parsed(records)) => assert_eq!(records.len(), 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(matches!(
            Envelope::parse(r#"{"type":"ping"}"#),
            Err(StreamError::Envelope(_))
        ));
    }

    #[test]
    fn test_decoder_split_frames() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").unwrap().is_empty());
        assert_eq!(decoder.push(b":1}\n\ndata: x\n").unwrap(), vec!["{\"a\":1}"]);
        assert_eq!(decoder.push(b"\n").unwrap(), vec!["x"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_decoder_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let out = decoder
            .push(b": OPENROUTER PROCESSING\r\n\r\nevent: message\r\ndata: one\r\ndata: two\r\n\r\n")
            .unwrap();
        assert_eq!(out, vec!["one\ntwo"]);
    }

    #[test]
    fn test_decoder_multibyte_split() {
        let mut decoder = SseDecoder::new();
        let text = "data: Varaždin\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC5).unwrap() + 1;
        assert!(decoder.push(&text[..split]).unwrap().is_empty());
        assert_eq!(decoder.push(&text[split..]).unwrap(), vec!["Varaždin"]);
    }

    #[test]
    fn test_decoder_finish() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: [DONE]").unwrap();
        assert_eq!(decoder.finish().unwrap(), Some("[DONE]".to_string()));
        assert_eq!(decoder.finish().unwrap(), None);
    }
}
