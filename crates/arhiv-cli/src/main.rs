//! Arhiv CLI - Command-line interface for archival record extraction.

use arhiv_cli::commands;
use arhiv_cli::{Cli, Command, Config, Formatter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> arhiv_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs stay quiet unless RUST_LOG asks for them
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load config from the given path or ~/.arhiv/config.toml
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Parse(args) => {
            commands::execute_parse(args, &config, &formatter).await?;
        }
        Command::Replay(args) => {
            commands::execute_replay(args, &formatter, config.settings.progress).await?;
        }
        Command::Export(args) => {
            commands::execute_export(args, &formatter)?;
        }
    }

    Ok(())
}
