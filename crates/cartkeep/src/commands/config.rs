//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use cartkeep_config::{CartkeepConfig, Outcome, Resolved, Resolver};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./cartkeep.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let resolved = Resolver::from_process().resolve()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&filled(&resolved.config))?);
        return Ok(());
    }

    let config = &resolved.config;

    println!("# Cartkeep Configuration\n");

    println!("Layers (later overrides earlier):");
    for layer in &resolved.layers {
        match &layer.outcome {
            Outcome::Applied => println!("  ✓ {}", layer.origin),
            Outcome::Absent => println!("  · {} (not found)", layer.origin),
            Outcome::Rejected(reason) => println!("  ✗ {} ({})", layer.origin, reason),
        }
    }
    println!();

    let server = config.server();
    println!("Server:");
    println!("  bind: {}:{}", server.bind, server.port);
    println!();

    let carts = config.carts();
    println!("Carts:");
    println!("  idle timeout:   {}s", carts.idle_timeout_secs);
    println!("  sweep interval: {}s", carts.sweep_interval_secs);
    println!();

    let logging = config.logging();
    println!("Logging:");
    println!("  level: {}", logging.level);
    println!("  file:  {}", logging.file);
    println!("  json:  {}", logging.json);
    println!();

    print_warnings(&resolved);

    if let Err(e) = config.validate() {
        println!("Invalid: {}\n", e);
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        println!("{}", config.to_toml()?);
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = cartkeep_config::user_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(cartkeep_config::sources::PROJECT_FILE)
    } else {
        cartkeep_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    cartkeep_config::write_config(&CartkeepConfig::with_defaults(), &path)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Every section filled in, for display.
fn filled(config: &CartkeepConfig) -> CartkeepConfig {
    CartkeepConfig {
        server: Some(config.server()),
        carts: Some(config.carts()),
        logging: Some(config.logging()),
    }
}

fn print_warnings(resolved: &Resolved) {
    let warnings = resolved.warnings();
    if warnings.is_empty() {
        return;
    }
    println!("Warnings:");
    for w in &warnings {
        println!("  ⚠ {}", w);
    }
    println!();
}
