//! Prism CLI - Batch extraction of visual features from image directories.
//!
//! Prism decodes every image in a directory, computes a bundle of derived
//! arrays per image (distinct colors, histograms, edges, local entropy,
//! keypoint overlay), stores each bundle as an NPZ container, and writes a
//! metadata index describing the corpus.
//!
//! # Usage
//!
//! ```bash
//! # Extract features for a directory
//! prism extract ./images
//!
//! # Write somewhere else, as JSON Lines
//! prism extract ./images --feature-dir out/features --index out/index.jsonl --format jsonl
//!
//! # Look inside one container
//! prism inspect ./visualize/features/cat.npz
//!
//! # View configuration
//! prism config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Prism - Batch extraction of visual features from image directories.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PRISM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract feature bundles and write the metadata index
    Extract(cli::extract::ExtractArgs),

    /// List the datasets stored in one feature container
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => prism_core::Config::load_from(path)?,
        None => match prism_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `prism config path`."
                );
                prism_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    match cli.command {
        Commands::Extract(args) => cli::extract::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
