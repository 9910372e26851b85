//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::prompt::PromptBuilder;
use crate::reader::{normalize_text, FileTextReader};
use crate::types::{ExtractionMetadata, ExtractionOutcome, ExtractionRequest, PreparedDocument};
use arhiv_domain::traits::{DocumentReader, RenderSink};
use arhiv_domain::StreamOutcome;
use arhiv_llm::{ChunkStream, StreamingProvider};
use arhiv_stream::{Completion, StreamError, StreamSession, TransportEvent};
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// The Extractor turns an uploaded document into archival records
pub struct Extractor<P, R = FileTextReader> {
    provider: P,
    reader: R,
    config: ExtractorConfig,
}

impl<P> Extractor<P, FileTextReader>
where
    P: StreamingProvider,
{
    /// Create an Extractor with the file reader and default configuration
    pub fn with_defaults(provider: P) -> Self {
        Self {
            provider,
            reader: FileTextReader,
            config: ExtractorConfig::default(),
        }
    }
}

impl<P, R> Extractor<P, R>
where
    P: StreamingProvider,
    R: DocumentReader,
    R::Error: Into<ExtractorError>,
{
    /// Create a new Extractor
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Config`] if `config` does not validate.
    pub fn new(provider: P, reader: R, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            provider,
            reader,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The model provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Read, normalise and check the document; no model call happens here
    pub fn prepare(&self, request: &ExtractionRequest) -> Result<PreparedDocument, ExtractorError> {
        let document = &request.document;
        let raw = self.reader.extract_text(document).map_err(Into::<ExtractorError>::into)?;
        let text = normalize_text(&raw);
        let length = text.chars().count();

        if length < self.config.min_text_length {
            return Err(ExtractorError::TextTooShort(length, self.config.min_text_length));
        }
        if length > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(length, self.config.max_text_length));
        }
        info!(source = %document.filename, text_length = length, "document prepared");

        let chat = PromptBuilder::new(&text).build();
        Ok(PreparedDocument {
            source: document.filename.clone(),
            text,
            chat,
        })
    }

    /// Start the model stream for a prepared document
    pub async fn open_stream(&self, prepared: &PreparedDocument) -> Result<ChunkStream, ExtractorError> {
        debug!(
            model = self.provider.model_name(),
            system_len = prepared.chat.system.len(),
            user_len = prepared.chat.user.len(),
            "requesting completion"
        );
        let chunks = timeout(
            self.config.connect_timeout(),
            self.provider.stream_chat(&prepared.chat),
        )
        .await
        .map_err(|_| ExtractorError::Timeout(self.config.connect_timeout_secs))??;
        Ok(chunks)
    }

    /// Run the whole pipeline, rendering progress into `sink`.
    ///
    /// Document and connection problems are errors. Once streaming started,
    /// failures end the operation with a non-final status and whatever
    /// records were already visible.
    pub async fn extract<S: RenderSink>(
        &self,
        request: &ExtractionRequest,
        sink: S,
    ) -> Result<ExtractionOutcome, ExtractorError> {
        let started = Instant::now();
        let prepared = self.prepare(request)?;
        let mut chunks = self.open_stream(&prepared).await?;

        let mut session = StreamSession::with_options(sink, self.config.extractor_options());
        let outcome = match timeout(
            self.config.stream_timeout(),
            consume(&mut session, &mut chunks),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    source = %prepared.source,
                    timeout_secs = self.config.stream_timeout_secs,
                    "model stream timed out"
                );
                session.on_error(ExtractorError::Timeout(self.config.stream_timeout_secs).to_string())?
            }
        };
        // Closing the receiver cancels the upstream request
        drop(chunks);

        let metadata = ExtractionMetadata {
            source: prepared.source.clone(),
            model_name: self.provider.model_name().to_string(),
            chunk_count: session.chunk_count(),
            text_length: prepared.text_length(),
            response_length: session.buffer().len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            source = %metadata.source,
            records = outcome.records.len(),
            status = %outcome.status,
            chunks = metadata.chunk_count,
            elapsed_ms = metadata.processing_time_ms,
            "extraction finished"
        );

        Ok(ExtractionOutcome {
            records: outcome.records,
            status: outcome.status,
            metadata,
        })
    }
}

/// Feed model fragments into the session until the stream ends
async fn consume<S: RenderSink>(
    session: &mut StreamSession<S>,
    chunks: &mut ChunkStream,
) -> Result<StreamOutcome, StreamError> {
    loop {
        let event = match chunks.recv().await {
            Some(Ok(fragment)) => TransportEvent::Delta(fragment),
            Some(Err(e)) => TransportEvent::Error(e.to_string()),
            None => TransportEvent::Complete(Completion::Deferred),
        };
        if let Some(outcome) = session.handle(event)? {
            return Ok(outcome);
        }
    }
}
