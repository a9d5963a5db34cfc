//! Revid CLI — Command-line interface for declarative video transformation.
//!
//! Usage:
//!   revid export <INPUT> [OPTIONS]     Transform one video
//!   revid batch <INPUTS>... [OPTIONS]  Transform a queue of videos sequentially
//!   revid check                        Check engine availability and config

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::TransformArgs;

#[derive(Parser)]
#[command(
    name = "revid",
    about = "Declarative video transformation over ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a single video and write the output artifact
    Export {
        /// Source video file
        input: PathBuf,

        /// Output file path (default: processed_<input name> in the
        /// current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Transform many videos sequentially with one settings snapshot
    Batch {
        /// Source video files, processed in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the per-item artifacts are written to
        #[arg(short = 'd', long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Check engine availability and configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    revid_common::logging::init_logging(&revid_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Export {
            input,
            output,
            transform,
        } => commands::export::run(input, output, transform).await,
        Commands::Batch {
            inputs,
            out_dir,
            transform,
        } => commands::batch::run(inputs, out_dir, transform).await,
        Commands::Check => commands::check::run().await,
    }
}
