//! Toolweave CLI, the main entry point.
//!
//! Commands:
//! - `encode`: Render a JSON message array as a dialect prompt
//! - `decode`: Parse raw model output into a message
//! - `run`: Ask the configured agent one question
//! - `init`: Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolweave_codecs::Dialect;

mod commands;

#[derive(Parser)]
#[command(
    name = "toolweave",
    about = "Toolweave: tool-calling agents over raw completion models",
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
    /// Encode a JSON message array into a prompt
    Encode {
        /// Prompt dialect (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Decode raw model output into a message
    Decode {
        /// Prompt dialect (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Input file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Send one message to the agent
    Run {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Print streamed messages as JSON instead of the final answer
        #[arg(long)]
        stream: bool,
    },

    /// Write the default config to ~/.toolweave/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode { dialect, file } => commands::encode::run(dialect, file)?,
        Commands::Decode { dialect, file } => commands::decode::run(dialect, file)?,
        Commands::Run { message, stream } => commands::run::run(message, stream).await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}
