//! DocWeave CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize config directory and config.toml
//! - `ingest`  — Chunk, embed, and catalog a directory of documents
//! - `tools`   — Show the tools built for the ingested documents
//! - `ask`     — Ask a question (single message or interactive)
//! - `doctor`  — Diagnose system health

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "docweave",
    about = "DocWeave — multi-document reasoning agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Ingest every supported file in a directory
    Ingest {
        /// Directory to scan
        dir: PathBuf,
    },

    /// List the tools built for the selected documents
    Tools {
        /// Restrict to these documents (name, id, or slug); defaults to all
        #[arg(short, long = "doc")]
        docs: Vec<String>,
    },

    /// Ask a question about the ingested documents
    Ask {
        /// Restrict to these documents (name, id, or slug); defaults to all
        #[arg(short, long = "doc")]
        docs: Vec<String>,

        /// Print the reasoning trace as JSON
        #[arg(short, long)]
        trace: bool,

        /// Ask once instead of entering interactive mode
        message: Option<String>,
    },

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Ingest { dir } => commands::ingest::run(dir).await?,
        Commands::Tools { docs } => commands::tools::run(docs).await?,
        Commands::Ask { docs, trace, message } => commands::ask::run(docs, trace, message).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
