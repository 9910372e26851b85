//! Arhiv LLM Provider Layer
//!
//! Streaming chat-completion providers. A provider turns one
//! [`ChatRequest`] into a [`ChunkStream`]: a channel of text fragments in
//! emission order, closed when the model is done.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted chunks for testing
//! - `OpenRouterProvider`: OpenRouter's OpenAI-compatible streaming API
//!
//! # Examples
//!
//! ```
//! use arhiv_llm::{ChatRequest, MockProvider, StreamingProvider};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new(vec!["{\"records\":", "[]}"]);
//! let mut chunks = provider.stream_chat(&ChatRequest::new("sys", "user")).await.unwrap();
//!
//! let mut text = String::new();
//! while let Some(chunk) = chunks.recv().await {
//!     text.push_str(&chunk.unwrap());
//! }
//! assert_eq!(text, "{\"records\":[]}");
//! # }
//! ```

#![warn(missing_docs)]

pub mod openrouter;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

pub use openrouter::OpenRouterProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// API key missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Fragments of one model response, in emission order.
///
/// The channel closes when the response is finished. An `Err` item is always
/// the last one. Dropping the receiver cancels the upstream request.
pub type ChunkStream = mpsc::Receiver<Result<String, LlmError>>;

/// A system/user prompt pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Instructions for the model
    pub system: String,
    /// The user turn
    pub user: String,
}

impl ChatRequest {
    /// Create a request
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A model that streams its answer
pub trait StreamingProvider: Send + Sync {
    /// Start a completion and return its fragment stream.
    ///
    /// Errors returned here happen before any fragment was produced
    /// (connection refused, bad credentials, unknown model).
    fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChunkStream, LlmError>> + Send;

    /// Model identifier, for logs and metadata
    fn model_name(&self) -> &str;
}

/// Mock provider replaying scripted chunks
///
/// No network calls and no timing: every chunk is queued before
/// [`StreamingProvider::stream_chat`] returns.
///
/// # Examples
///
/// ```
/// use arhiv_llm::MockProvider;
///
/// let provider = MockProvider::from_text("abcdefg", 3);
/// assert_eq!(provider.chunks(), &["abc", "def", "g"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    chunks: Vec<String>,
    model: String,
    failure: Option<(usize, LlmError)>,
    request_error: Option<LlmError>,
    call_count: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<ChatRequest>>>,
}

impl MockProvider {
    /// Replay `chunks` verbatim
    pub fn new<S: Into<String>>(chunks: Vec<S>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            model: "mock-model".to_string(),
            failure: None,
            request_error: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Split `text` into chunks of `chunk_chars` characters
    pub fn from_text(text: &str, chunk_chars: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let chunks = chars
            .chunks(chunk_chars.max(1))
            .map(|c| c.iter().collect::<String>())
            .collect();
        Self::new::<String>(chunks)
    }

    /// Emit `error` after the first `after` chunks instead of finishing
    pub fn with_failure_after(mut self, after: usize, error: LlmError) -> Self {
        self.failure = Some((after, error));
        self
    }

    /// Fail the request itself, before any chunk
    pub fn with_request_error(mut self, error: LlmError) -> Self {
        self.request_error = Some(error);
        self
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Scripted chunks
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Get the number of times stream_chat was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// The most recent request received
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn script(&self) -> Vec<Result<String, LlmError>> {
        match &self.failure {
            Some((after, error)) => self
                .chunks
                .iter()
                .take(*after)
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(error.clone())))
                .collect(),
            None => self.chunks.iter().cloned().map(Ok).collect(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![r#"{"records":[]}"#])
    }
}

impl StreamingProvider for MockProvider {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        if let Some(error) = &self.request_error {
            return Err(error.clone());
        }

        let script = self.script();
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for item in script {
            // Capacity covers the whole script
            if tx.try_send(item).is_err() {
                break;
            }
        }
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
