//! Cartkeep - in-memory shopping cart service with idle eviction
//!
//! Main entry point for the Cartkeep CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;
mod logging;

use commands::{config, start, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Cartkeep - in-memory shopping cart service with idle eviction
#[derive(Parser)]
#[command(name = "cartkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "CARTKEEP_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Cartkeep server
    Start(start::StartArgs),

    /// Show server status
    Status(status::StatusArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let explicit_config = match &cli.command {
        Commands::Start(args) => args.config.clone(),
        _ => None,
    };
    let logging = logging::section(cartkeep_config::Resolver::from_process(), explicit_config);
    let _guard = logging::init(cli.verbose, &logging);

    let server_url = cli
        .server
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
