use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragdex::config::load_config;
use ragdex::ingest::run_sync;
use ragdex::sources::list_sources;

#[derive(Parser)]
#[command(name = "ragdex", version, about = "Index content sources into a vector store")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "ragdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the configured sources and index them into the collection
    Sync {
        /// Connector selection: "all", a type ("wiki"), or "type:name"
        #[arg(long, default_value = "all")]
        source: String,

        /// Run against an in-memory store with mock embeddings
        #[arg(long)]
        dry_run: bool,

        /// Drop and recreate the collection before indexing
        #[arg(long)]
        recreate: bool,

        /// Index at most this many items (after dedup)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the configured connectors
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            source,
            dry_run,
            recreate,
            limit,
        } => {
            run_sync(&config, &source, dry_run, recreate, limit).await?;
        }
        Commands::Sources => {
            list_sources(&config)?;
        }
    }

    Ok(())
}
