//! Arhiv Parse Service
//!
//! HTTP front end for the extraction pipeline. Uploaded documents are
//! answered with a server-sent event stream of the model's output followed
//! by the strict-parsed record list.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use arhiv_extractor::{Extractor, ExtractorError, FileTextReader};
use arhiv_llm::{LlmError, OpenRouterProvider, StreamingProvider};
use config::{ProviderConfig, ServerConfig};
use handlers::{create_router, AppState};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The model provider could not be set up
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// The extraction pipeline could not be set up
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the stderr log subscriber, honouring `RUST_LOG`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed by an embedding binary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the OpenRouter client described by `config`
pub fn build_provider(
    config: &ProviderConfig,
    connect_timeout: Duration,
) -> Result<OpenRouterProvider, ServerError> {
    let provider = OpenRouterProvider::with_connect_timeout(config.api_key()?, connect_timeout)?
        .with_base_url(config.base_url.as_str())
        .with_model(config.model.as_str())
        .with_attribution(config.referer(), config.title.as_str());
    Ok(provider)
}

/// Start the parse service
///
/// Validates configuration, connects the model provider and serves until
/// the listener fails.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    init_tracing();
    config.validate()?;

    info!("Starting Arhiv parse service");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {}", config.provider.model);
    info!("Framing: {:?}", config.framing);

    let provider = build_provider(&config.provider, config.extractor.connect_timeout())?;
    serve(config, provider).await
}

/// Serve with an already constructed provider
pub async fn serve<P>(config: ServerConfig, provider: P) -> Result<(), ServerError>
where
    P: StreamingProvider + 'static,
{
    let extractor = Extractor::new(provider, FileTextReader, config.extractor.clone())?;
    let state = AppState::new(extractor)
        .with_framing(config.framing)
        .with_upload_limit(config.max_upload_bytes);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Parse service listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_build_provider_requires_key() {
        let provider = ProviderConfig {
            api_key_env: "ARHIV_SERVER_TEST_UNSET_KEY".to_string(),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            build_provider(&provider, Duration::from_secs(1)),
            Err(ServerError::Config(ConfigError::MissingApiKey(_)))
        ));
    }
}
