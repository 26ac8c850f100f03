//! # Content Pipeline CLI (`cpl`)
//!
//! The `cpl` binary is the orchestrator for the content intelligence
//! pipeline: it drives ingestion (chunk + store), asset matching, and the
//! content policy gate from the command line.
//!
//! ## Usage
//!
//! ```bash
//! cpl --config ./config/cpl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cpl init` | Create the SQLite database and run schema migrations |
//! | `cpl ingest <path>` | Chunk a document (or directory) and store it |
//! | `cpl match <keywords...>` | Rank registry assets against keywords |
//! | `cpl validate <path> --zone <zone>` | Policy-gate a draft before publish |
//! | `cpl assets` | List the asset registry and its health |
//! | `cpl stats` | Show knowledge store statistics |

mod chunker;
mod config;
mod db;
mod guardian;
mod ingest;
mod json_extract;
mod match_cmd;
mod matcher;
mod migrate;
mod models;
mod registry;
mod stats;
mod store;
mod validate_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Content Pipeline CLI — document chunking, keyword asset matching, and an
/// AI-backed content policy gate.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "cpl",
    about = "Content Pipeline — document chunking, asset matching, and an AI content policy gate",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cpl.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the knowledge store tables.
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Chunk a document (or a directory of documents) and store it.
    ///
    /// Each file becomes one document keyed by its `source`; re-ingesting a
    /// source fully replaces its previous chunk set. Unchanged content is
    /// skipped unless `--full` is passed.
    Ingest {
        /// A markdown/text file, or a directory to scan for `*.md`/`*.txt`.
        path: PathBuf,

        /// Source key for a single file (defaults to the file stem).
        #[arg(long)]
        source: Option<String>,

        /// Document title (defaults to the file stem).
        #[arg(long)]
        title: Option<String>,

        /// Category recorded on every chunk (defaults to `general`).
        #[arg(long)]
        category: Option<String>,

        /// Tags recorded on every chunk.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Re-ingest even if the content is unchanged.
        #[arg(long)]
        full: bool,

        /// Show file and chunk counts without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Rank registry assets against keywords.
    ///
    /// Scores every asset in the registry by lexical keyword overlap and
    /// prints the top matches. Zero-scoring assets are excluded.
    Match {
        /// Keywords to match against asset tags, descriptions, moods, and
        /// source labels.
        keywords: Vec<String>,

        /// Maximum number of matches to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate a draft against a content zone's ruleset.
    ///
    /// Submits the draft to the reasoning backend and prints the verdict.
    /// The gate fails open: backend outages degrade the verdict instead of
    /// blocking.
    Validate {
        /// The draft file to validate.
        path: PathBuf,

        /// Content zone: `product`, `science`, or `brand`.
        #[arg(long)]
        zone: String,

        /// Print the verdict as JSON instead of the human-readable form.
        #[arg(long)]
        json: bool,
    },

    /// List the asset registry and its health.
    Assets,

    /// Show knowledge store statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            path,
            source,
            title,
            category,
            tags,
            full,
            dry_run,
        } => {
            ingest::run_ingest(&cfg, &path, source, title, category, tags, full, dry_run).await?;
        }
        Commands::Match { keywords, limit } => {
            match_cmd::run_match(&cfg, &keywords, limit)?;
        }
        Commands::Validate { path, zone, json } => {
            validate_cmd::run_validate(&cfg, &path, &zone, json).await?;
        }
        Commands::Assets => {
            registry::run_assets(&cfg)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
