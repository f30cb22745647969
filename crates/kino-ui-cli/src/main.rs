//! Kino UI CLI - Headless player UI simulator
//!
//! Features:
//! - Replay a scripted sequence of player events against declared UI variants
//! - Report the layout selected after every step
//! - Validate UI configuration files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod scenario;

/// Kino UI CLI - Player UI toolkit
#[derive(Parser)]
#[command(name = "kino-ui")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Headless simulator for the Kino player UI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario of player events and report the selected layouts
    Simulate {
        /// Path to the scenario JSON file
        scenario: PathBuf,
    },

    /// Check a UI configuration file
    ValidateConfig {
        /// Path to the configuration JSON file
        config: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    kino_ui::init();

    match cli.command {
        Commands::Simulate { scenario } => {
            commands::simulate(&scenario, &cli.format).await?;
        }
        Commands::ValidateConfig { config } => {
            commands::validate_config(&config, &cli.format).await?;
        }
    }

    Ok(())
}
