//! semcode - semantic code indexing from the command line
//!
//! Chunks a project with tree-sitter, classifies and stores the chunks, and
//! searches them by meaning or by text.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use semcode::config;

mod cli;
mod ui;
mod watch;

/// semcode - semantic code index
#[derive(Parser)]
#[command(name = "semcode")]
#[command(author = "Mustafa Saraç <mustafa@mustafasarac.com>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Index a codebase into classified, searchable semantic chunks", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true, env = "SEMCODE_ROOT")]
    root: Option<String>,

    /// Index database path (overrides the configured one)
    #[arg(long, global = true, env = "SEMCODE_DB")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, classify and store chunks
    Index {
        /// Files or directories to index (defaults to the whole project)
        paths: Vec<String>,

        /// Read paths to index from a file, one per line
        #[arg(long)]
        files_from: Option<String>,

        /// Generate missing embeddings afterwards
        #[arg(short, long)]
        embed: bool,
    },

    /// Generate embeddings for chunks that have none
    Embed,

    /// Search chunks by meaning
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum cosine similarity
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search chunks by text
    Grep {
        /// Text to look for in names, purposes and code
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the stored chunks of one file
    File {
        /// File path
        path: String,

        /// Print each chunk's code
        #[arg(long)]
        code: bool,

        /// Print chunks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show, validate or scaffold classification rules
    Rules {
        /// Validate a rules file instead of printing the active rules
        #[arg(long)]
        check: Option<String>,

        /// Write the built-in rules to the project's rules file
        #[arg(long)]
        init: bool,
    },

    /// Re-index files and reload rules as they change
    Watch,

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize configuration file
        #[arg(long)]
        init: bool,
    },

    /// Show version and system info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_writer(std::io::stderr);
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(builder.with_env_filter(EnvFilter::from_default_env()).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?;
    }

    // Load configuration
    let config = config::load_config(cli.config.as_deref())?;

    debug!("semcode v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::Config { show, init } = cli.command {
        if init {
            config::init_config(cli.config.as_deref())?;
        } else if show {
            config::show_config(&config)?;
        }
        return Ok(());
    }

    let ws = cli::Workspace::open(config, cli.root.as_deref(), cli.db.as_deref())?;

    match cli.command {
        Commands::Index { paths, files_from, embed } => {
            cli::index::run(&ws, &paths, files_from.as_deref(), embed).await?;
        }
        Commands::Embed => {
            cli::embed::run(&ws).await?;
        }
        Commands::Search { query, limit, threshold, json } => {
            cli::search::run(&ws, &query, limit, threshold, json).await?;
        }
        Commands::Grep { query, limit, json } => {
            cli::search::grep(&ws, &query, limit, json)?;
        }
        Commands::File { path, code, json } => {
            cli::file::run(&ws, &path, code, json)?;
        }
        Commands::Stats { json } => {
            cli::stats::run(&ws, json)?;
        }
        Commands::Rules { check, init } => {
            cli::rules::run(&ws, check.as_deref(), init)?;
        }
        Commands::Watch => {
            watch::run(&ws).await?;
        }
        Commands::Info => {
            cli::info::run(&ws).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
