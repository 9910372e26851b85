//! Arhiv parse service binary
//!
//! Starts the HTTP server that streams archival records out of uploaded
//! documents.

use arhiv_server::{config::ServerConfig, start_server, ServerError};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using default configuration");
        eprintln!("Usage: arhiv-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default_test_config()
    };

    start_server(config).await
}

fn print_help() {
    println!("Arhiv parse service - archival record extraction over SSE");
    println!();
    println!("USAGE:");
    println!("    arhiv-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENDPOINTS:");
    println!("    POST /api/parse-document   Stream records out of an uploaded document");
    println!("    GET  /health               Service health and model name");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address / bind_port (default: 127.0.0.1:3000)");
    println!("    - framing: \"snapshot\" (default) or \"delta\"");
    println!("    - [provider]: base_url, model, api_key_env, site_url, title");
    println!("    - [extractor]: min_text_length, max_text_length, stream_timeout_secs, ...");
    println!();
    println!("    The API key is read from OPENROUTER_API_KEY unless api_key_env says otherwise.");
    println!();
}
