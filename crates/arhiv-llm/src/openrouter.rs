//! OpenRouter Provider Implementation
//!
//! Streams chat completions from OpenRouter's OpenAI-compatible API.
//!
//! # Features
//!
//! - Server-sent event streaming (`stream: true`)
//! - Retry of the initial request with exponential backoff
//! - Status code mapping to [`LlmError`]
//! - Upstream cancellation when the chunk receiver is dropped
//!
//! # Examples
//!
//! ```no_run
//! use arhiv_llm::OpenRouterProvider;
//!
//! let provider = OpenRouterProvider::new("sk-or-...")
//!     .unwrap()
//!     .with_model("google/gemini-2.5-flash-lite");
//! ```

use crate::{ChatRequest, ChunkStream, LlmError, StreamingProvider};
use arhiv_stream::SseDecoder;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default OpenRouter API base URL
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-lite";

/// Value of the `X-Title` attribution header
pub const DEFAULT_TITLE: &str = "Arhiv Parser";

/// Value of the `HTTP-Referer` attribution header
pub const DEFAULT_REFERER: &str = "https://localhost:3000";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Default connect timeout (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of attempts for the initial request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Marker payload closing an OpenAI-style event stream
const DONE_MARKER: &str = "[DONE]";

/// Fragments buffered between the HTTP reader and the consumer
const CHANNEL_CAPACITY: usize = 64;

/// OpenRouter streaming provider
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    base_url: String,
    api_key: String,
    model: String,
    referer: String,
    title: String,
    client: reqwest::Client,
    max_retries: u32,
    retry_base: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// One streamed completion chunk
#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// What one SSE payload means for the consumer
#[derive(Debug, PartialEq, Eq)]
enum Payload {
    Content(String),
    Done,
    Skip,
}

impl OpenRouterProvider {
    /// Create a provider with the default model and endpoint
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unauthorized`] for an empty key and
    /// [`LlmError::Other`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_connect_timeout(api_key, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Create a provider with a custom connect timeout.
    ///
    /// There is no overall request timeout: a completion streams for as long
    /// as the model writes. Callers bound the stream themselves.
    pub fn with_connect_timeout(
        api_key: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Unauthorized("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base: Duration::from_secs(1),
        })
    }

    /// Create a provider from the `OPENROUTER_API_KEY` environment variable
    pub fn from_env() -> Result<Self, LlmError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| LlmError::Unauthorized(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key)
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different API base URL (no trailing slash)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the attribution headers
    pub fn with_attribution(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }

    /// Set the maximum number of attempts for the initial request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the first backoff delay; later ones double
    pub fn with_retry_base(mut self, delay: Duration) -> Self {
        self.retry_base = delay;
        self
    }

    /// Completions endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send the request, retrying network failures and 5xx responses
    async fn send_with_retry(&self, request: &ChatRequest) -> Result<reqwest::Response, LlmError> {
        let url = self.endpoint();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            stream: true,
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("HTTP-Referer", &self.referer)
                .header("X-Title", &self.title)
                .json(&body)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let error = status_error(status, &error_text, &self.model);
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    warn!(%status, attempt = attempts + 1, "completion request failed");
                    last_error = Some(error);
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempts + 1, "completion request failed");
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = self.retry_base * 2u32.pow(attempts - 1);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl StreamingProvider for OpenRouterProvider {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        debug!(model = %self.model, url = %self.endpoint(), "opening completion stream");
        let response = self.send_with_retry(request).await?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(pump(response, tx));
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Copy content fragments from the HTTP body into the channel
async fn pump(mut response: reqwest::Response, tx: mpsc::Sender<Result<String, LlmError>>) {
    let mut decoder = SseDecoder::new();
    let mut fragments = 0usize;

    loop {
        let (payloads, finished) = match response.chunk().await {
            Ok(Some(bytes)) => (decoder.push(&bytes), false),
            Ok(None) => (decoder.finish().map(|rest| rest.into_iter().collect()), true),
            Err(e) => {
                let _ = tx
                    .send(Err(LlmError::Communication(format!("Stream interrupted: {}", e))))
                    .await;
                return;
            }
        };

        let payloads: Vec<String> = match payloads {
            Ok(payloads) => payloads,
            Err(e) => {
                let _ = tx.send(Err(LlmError::InvalidResponse(e.to_string()))).await;
                return;
            }
        };

        for payload in payloads {
            match parse_payload(&payload) {
                Ok(Payload::Content(text)) => {
                    fragments += 1;
                    if tx.send(Ok(text)).await.is_err() {
                        debug!(fragments, "chunk receiver dropped, cancelling upstream");
                        return;
                    }
                }
                Ok(Payload::Done) => {
                    debug!(fragments, "completion stream finished");
                    return;
                }
                Ok(Payload::Skip) => {}
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }

        if finished {
            debug!(fragments, "completion body ended without done marker");
            return;
        }
    }
}

/// Interpret the `data` payload of one upstream event
fn parse_payload(payload: &str) -> Result<Payload, LlmError> {
    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Ok(Payload::Done);
    }
    if payload.is_empty() {
        return Ok(Payload::Skip);
    }

    let chunk: CompletionChunk = serde_json::from_str(payload)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Communication(error.message));
    }

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(content) if !content.is_empty() => Ok(Payload::Content(content)),
        _ => Ok(Payload::Skip),
    }
}

/// Map a non-success status to an error
fn status_error(status: StatusCode, body: &str, model: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::Unauthorized(format!("HTTP {}: {}", status, body))
        }
        StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(model.to_string()),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
        _ => LlmError::Communication(format!("HTTP {}: {}", status, body)),
    }
}
