//! # pagerag CLI
//!
//! ```bash
//! pagerag --config ./config/pagerag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagerag ingest [--reset]` | Index new chunks from the documents directory |
//! | `pagerag query "<question>" [--sources]` | Answer a question from the indexed documents |
//! | `pagerag stats` | Show what the store contains |
//! | `pagerag chat "<message>"` | Talk to the generation model directly |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagerag::{chat, config, ingest, logging, query, stats};

/// pagerag: incremental PDF indexing and retrieval-augmented answers from
/// local models.
#[derive(Parser)]
#[command(
    name = "pagerag",
    about = "Incremental page-aware document indexing and retrieval-augmented question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/pagerag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, split, and index documents, skipping chunks already stored.
    Ingest {
        /// Delete the whole store before indexing.
        #[arg(long)]
        reset: bool,
    },

    /// Answer a question using the most similar stored chunks as context.
    Query {
        /// The question.
        query_text: String,

        /// Also print the ids of the chunks the answer was built from.
        #[arg(long)]
        sources: bool,
    },

    /// Show store location, size, and per-source chunk counts.
    Stats,

    /// Send one message to the generation model, without retrieval.
    Chat {
        /// The message.
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { reset } => {
            ingest::run_ingest(&cfg, reset).await?;
        }
        Commands::Query {
            query_text,
            sources,
        } => {
            query::run_query(&cfg, &query_text, sources).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Chat { message } => {
            chat::run_chat(&cfg, &message).await?;
        }
    }

    Ok(())
}
