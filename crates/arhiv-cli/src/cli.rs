//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arhiv CLI - Extract Croatian archival records from documents.
#[derive(Debug, Parser)]
#[command(name = "arhiv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ARHIV_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (identifiers only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract records from a document through the model
    Parse(ParseArgs),

    /// Replay a recorded server-sent event stream
    Replay(ReplayArgs),

    /// Convert a JSON record list to the tab-separated export format
    Export(ExportArgs),
}

/// Options shared by commands that display records.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ViewArgs {
    /// Only show records containing this text in any field
    #[arg(short, long)]
    pub search: Option<String>,

    /// Also write the records to this file in export format
    #[arg(long, value_name = "OUT")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the parse command.
#[derive(Debug, clap::Args)]
pub struct ParseArgs {
    /// Document to parse (.txt, .pdf, .docx, .doc)
    pub file: PathBuf,

    /// Override the configured model
    #[arg(short, long)]
    pub model: Option<String>,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// Arguments for the replay command.
#[derive(Debug, clap::Args)]
pub struct ReplayArgs {
    /// File holding the raw `text/event-stream` body
    pub file: PathBuf,

    /// Pause between frames, in milliseconds
    #[arg(long, default_value = "0")]
    pub pace_ms: u64,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// Arguments for the export command.
#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    /// JSON file: an array of records or an object with a `records` array
    pub input: PathBuf,

    /// Destination file
    #[arg(short, long)]
    pub out: PathBuf,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
