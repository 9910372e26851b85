//! HTTP request handlers for the parse service.
//!
//! Implements document parsing over server-sent events and the health check
//! using axum.

use crate::config::Framing;
use arhiv_domain::Document;
use arhiv_extractor::{ExtractionRequest, Extractor, ExtractorError};
use arhiv_llm::{ChunkStream, StreamingProvider};
use arhiv_stream::{parse_document as parse_records, Envelope};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Error sent when the finished response is not valid JSON
pub const PARSE_FAILED_MESSAGE: &str = "Failed to parse JSON";

/// Frames buffered between the relay task and the HTTP body
const FRAME_BUFFER: usize = 32;

/// Largest request body accepted when no limit is configured
const DEFAULT_UPLOAD_LIMIT: usize = 25 * 1024 * 1024;

/// Shared application state
pub struct AppState<P> {
    /// Document pipeline
    pub extractor: Arc<Extractor<P>>,
    /// SSE framing for model output
    pub framing: Framing,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            framing: self.framing,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl<P> AppState<P> {
    /// State with snapshot framing and the default upload limit
    pub fn new(extractor: Extractor<P>) -> Self {
        Self {
            extractor: Arc::new(extractor),
            framing: Framing::default(),
            max_upload_bytes: DEFAULT_UPLOAD_LIMIT,
        }
    }

    /// Use a different SSE framing
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Use a different request body limit
    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Document parse request
#[derive(Debug, Default, Deserialize)]
pub struct ParseDocumentRequest {
    /// The uploaded file
    #[serde(default)]
    pub file: Option<UploadedFile>,
}

/// A file as sent by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Base64 content, optionally as a `data:` URL
    #[serde(default)]
    pub data: Option<String>,
    /// Declared media type
    #[serde(default)]
    pub media_type: String,
    /// Original file name
    #[serde(default)]
    pub filename: String,
}

impl UploadedFile {
    /// Decode the payload into a document
    pub fn into_document(self) -> Result<Document, AppError> {
        let data = match self.data {
            Some(data) if !data.is_empty() => data,
            _ => return Err(AppError::NoFile),
        };
        // Everything after the first comma of a data URL is the payload
        let encoded = match data.split_once(',') {
            Some((_, payload)) if !payload.is_empty() => payload,
            _ => data.as_str(),
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::BadRequest(format!("Invalid file data: {}", e)))?;

        Ok(Document::new(self.filename, self.media_type, bytes))
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model answering parse requests
    pub model: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Underlying cause, for server-side failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// The request carried no file data
    NoFile,
    /// The request or its document cannot be processed
    BadRequest(String),
    /// The model could not be reached
    ParseFailed(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::NoFile => (StatusCode::BAD_REQUEST, "No file provided".to_string(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::ParseFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to parse document".to_string(),
                Some(details),
            ),
        };

        let body = Json(ErrorResponse { error, details });
        (status, body).into_response()
    }
}

impl From<ExtractorError> for AppError {
    fn from(e: ExtractorError) -> Self {
        if e.is_client_error() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::ParseFailed(e.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// POST /api/parse-document - Stream archival records out of a document
///
/// Document problems are answered with a JSON error before any model call.
/// Once the model stream is open the response is `text/event-stream` and
/// failures travel inside it as `error` frames.
async fn parse_document<P>(
    State(state): State<AppState<P>>,
    body: Result<Json<ParseDocumentRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    P: StreamingProvider + 'static,
{
    let Json(body) = body?;
    let document = body.file.ok_or(AppError::NoFile)?.into_document()?;
    info!(filename = %document.filename, bytes = document.bytes.len(), "parse request");

    let prepared = state.extractor.prepare(&ExtractionRequest::new(document))?;
    let chunks = state.extractor.open_stream(&prepared).await.map_err(|e| {
        warn!(source = %prepared.source, error = %e, "model request failed");
        AppError::from(e)
    })?;

    let (frames, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(relay(
        chunks,
        frames,
        state.framing,
        state.extractor.config().stream_timeout(),
        prepared.source,
    ));

    Ok(event_stream(rx))
}

/// GET /health - Service health check
async fn health_check<P>(State(state): State<AppState<P>>) -> Json<HealthCheckResponse>
where
    P: StreamingProvider + 'static,
{
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        model: state.extractor.provider().model_name().to_string(),
    })
}

/// Wrap encoded frames as an SSE response
fn event_stream(frames: mpsc::Receiver<String>) -> Response {
    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

/// Forward model fragments as SSE frames, then the final verdict.
///
/// Returns early when the client goes away; dropping `chunks` then cancels
/// the upstream request.
async fn relay(
    mut chunks: ChunkStream,
    frames: mpsc::Sender<String>,
    framing: Framing,
    limit: Duration,
    source: String,
) {
    let deadline = Instant::now() + limit;
    let mut content = String::new();
    let mut chunk_count = 0usize;

    let last = loop {
        let next = match timeout_at(deadline, chunks.recv()).await {
            Ok(next) => next,
            Err(_) => {
                warn!(source = %source, chunks = chunk_count, "model stream timed out");
                break Envelope::transport_error(ExtractorError::Timeout(limit.as_secs()).to_string());
            }
        };

        match next {
            Some(Ok(fragment)) => {
                if fragment.is_empty() {
                    continue;
                }
                content.push_str(&fragment);
                chunk_count += 1;
                if chunk_count == 1 {
                    debug!(source = %source, "first chunk received");
                } else if chunk_count % 10 == 0 {
                    debug!(chunks = chunk_count, chars = content.len(), "streaming");
                }

                let envelope = match framing {
                    Framing::Snapshot => Envelope::content(content.clone()),
                    Framing::Delta => Envelope::delta(fragment),
                };
                if !send(&frames, &envelope).await {
                    info!(source = %source, chunks = chunk_count, "client disconnected");
                    return;
                }
            }
            Some(Err(e)) => {
                warn!(source = %source, error = %e, "model stream failed");
                break Envelope::transport_error(e.to_string());
            }
            None => break final_envelope(&source, &content),
        }
    };

    info!(source = %source, chunks = chunk_count, chars = content.len(), "stream finished");
    send(&frames, &last).await;
}

/// Strict-parse the finished response
fn final_envelope(source: &str, content: &str) -> Envelope {
    match parse_records(content) {
        Ok(records) => {
            info!(source = %source, records = records.len(), "records extracted");
            Envelope::complete(&records)
        }
        Err(e) => {
            warn!(source = %source, error = %e, "final response did not parse");
            Envelope::parse_error(PARSE_FAILED_MESSAGE)
        }
    }
}

/// Encode and queue one frame; false once the client is gone
async fn send(frames: &mpsc::Sender<String>, envelope: &Envelope) -> bool {
    match envelope.to_sse_frame() {
        Ok(frame) => frames.send(frame).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to encode frame");
            false
        }
    }
}

/// Create the axum router with all routes
pub fn create_router<P>(state: AppState<P>) -> AxumRouter
where
    P: StreamingProvider + 'static,
{
    let upload_limit = state.max_upload_bytes;
    AxumRouter::new()
        .route("/api/parse-document", post(parse_document::<P>))
        .route("/health", get(health_check::<P>))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
