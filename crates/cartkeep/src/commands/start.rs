//! Start command - runs the cart server and its idle sweeper.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{info, warn};

use cartkeep_config::{CartkeepConfig, CartsSection, Resolved, Resolver, ServerSection};
use cartkeep_server::{AppState, Server, ServerConfig};
use cartkeep_store::{CartStore, Sweeper};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Seconds of inactivity before a cart is evicted (overrides config)
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Seconds between eviction sweeps (overrides config)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let resolved = load(&args)?;

    for warning in resolved.warnings() {
        eprintln!("warning: {}", warning);
    }

    if ctx.verbose {
        let mut applied = resolved.applied().peekable();
        if applied.peek().is_none() {
            println!("No config files or overrides found, using defaults + CLI args");
        }
        for origin in applied {
            println!("Using config: {}", origin);
        }
    }

    let config = apply_overrides(resolved.config, &args);
    config.validate().context("invalid configuration")?;

    let addr = config.server().socket_addr()?;
    let store_config = config.carts().store_config();

    // ── Store and sweeper ────────────────────────────────────────────────

    let store = CartStore::new(store_config);
    let sweeper = Sweeper::new(store.clone()).spawn();

    // ── Server ───────────────────────────────────────────────────────────

    let server_config = ServerConfig::new().with_bind_address(addr);
    let server = Server::new(AppState::new(store, server_config));

    println!("Cartkeep server starting on http://{}", addr);
    println!("Press Ctrl+C to stop");

    let result = server.run_until(shutdown_signal()).await;

    // ── Graceful shutdown ────────────────────────────────────────────────

    sweeper.shutdown().await;
    info!("Cartkeep stopped");

    result.map_err(Into::into)
}

/// Resolve files and env overrides. `--config` replaces file discovery and
/// must exist and parse.
fn load(args: &StartArgs) -> Result<Resolved> {
    Resolver::from_process()
        .explicit_file(args.config.clone())
        .resolve()
        .context("failed to load configuration")
}

/// Layer CLI flags over the file configuration.
fn apply_overrides(mut config: CartkeepConfig, args: &StartArgs) -> CartkeepConfig {
    let mut server: ServerSection = config.server();
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(ref bind) = args.bind {
        server.bind = bind.clone();
    }
    config.server = Some(server);

    let mut carts: CartsSection = config.carts();
    if let Some(secs) = args.idle_timeout_secs {
        carts.idle_timeout_secs = secs;
    }
    if let Some(secs) = args.sweep_interval_secs {
        carts.sweep_interval_secs = secs;
    }
    config.carts = Some(carts);

    config
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, stop the process to exit");
        std::future::pending::<()>().await;
    }
}
