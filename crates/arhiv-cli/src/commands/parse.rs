//! Parse command implementation.

use crate::cli::ParseArgs;
use crate::commands::show_results;
use crate::config::{Config, ProviderSettings};
use crate::error::Result;
use crate::output::Formatter;
use crate::sink::TerminalSink;
use arhiv_domain::Document;
use arhiv_extractor::{ExtractionRequest, Extractor, FileTextReader};
use arhiv_llm::OpenRouterProvider;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Execute the parse command.
pub async fn execute_parse(args: ParseArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let document = read_document(&args.file).await?;

    let provider = build_provider(
        &config.provider,
        args.model.as_deref(),
        config.extractor.connect_timeout(),
    )?;
    let extractor = Extractor::new(provider, FileTextReader, config.extractor.clone())?;

    let mut sink = TerminalSink::stderr(formatter.color_enabled());
    if !config.settings.progress {
        sink = sink.quiet();
    }

    let outcome = extractor
        .extract(&ExtractionRequest::new(document), &mut sink)
        .await?;
    info!(
        model = %outcome.metadata.model_name,
        chunks = outcome.metadata.chunk_count,
        elapsed_ms = outcome.metadata.processing_time_ms,
        "parse finished"
    );

    show_results(&outcome.records, &outcome.status, &args.view, formatter)
}

/// Load a document; the format is chosen from the file extension.
pub async fn read_document(path: &Path) -> Result<Document> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Document::new(filename, "", bytes))
}

/// Build the OpenRouter client from settings, with an optional model override.
pub fn build_provider(
    settings: &ProviderSettings,
    model: Option<&str>,
    connect_timeout: Duration,
) -> Result<OpenRouterProvider> {
    let provider = OpenRouterProvider::with_connect_timeout(settings.api_key()?, connect_timeout)?
        .with_base_url(settings.base_url.as_str())
        .with_model(model.unwrap_or(&settings.model))
        .with_attribution(settings.site_url.as_str(), settings.title.as_str());
    Ok(provider)
}
