//! Unified CLI for the consistency-model key-value store.
//!
//! # Quick Start
//!
//! ```bash
//! # Validate a fleet config
//! kv config ./config.json
//!
//! # Start one replica of the fleet (run once per index)
//! kv start ./config.json 0 --mode linearizable
//!
//! # Run the scenario harness against a locally spawned fleet
//! kv bench causal
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and print a fleet configuration file.
    Config {
        /// Path to the JSON config file.
        path: String,
    },

    /// Start one replica from a fleet configuration.
    Start {
        /// Path to the JSON config file.
        path: String,

        /// This replica's 0-based index into the config's port tables.
        index: usize,

        /// Consistency mode: linearizable, sequential, causal, or eventual.
        #[arg(short, long, default_value = "linearizable")]
        mode: String,
    },

    /// Run the S1-S6 scenario harness against a locally spawned fleet.
    Bench {
        /// Consistency mode: linearizable, sequential, causal, or eventual.
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { path } => commands::config::run(&path),
        Commands::Start { path, index, mode } => commands::start::run(&path, index, &mode).await,
        Commands::Bench { mode } => commands::bench::run(&mode).await,
    }
}
