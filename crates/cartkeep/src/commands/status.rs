//! Status command - asks a running server for its health and cart count.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use super::Context;
use crate::client::Client;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// What we learned about the server at `server_url`.
#[derive(Debug, Serialize)]
struct Report {
    server_url: String,
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    carts: Option<usize>,
    #[serde(skip)]
    error: Option<String>,
}

impl Report {
    async fn gather(server_url: &str) -> Result<Self> {
        let health = Client::new(server_url)?.health().await;
        let mut report = Report {
            server_url: server_url.to_string(),
            running: health.is_ok(),
            version: None,
            carts: None,
            error: None,
        };
        match health {
            Ok(h) => {
                report.version = Some(h.version);
                report.carts = Some(h.carts);
            }
            Err(e) => report.error = Some(format!("{e:#}")),
        }
        Ok(report)
    }

    /// Label/value pairs for the text view, in display order.
    fn rows(&self, verbose: bool) -> Vec<(&'static str, String)> {
        let state = if self.running {
            style("● running").green().to_string()
        } else {
            style("● not running").red().to_string()
        };

        let mut rows = vec![("Status", state)];
        if let Some(version) = &self.version {
            rows.push(("Version", version.clone()));
        }
        if let Some(carts) = self.carts {
            rows.push(("Live carts", carts.to_string()));
        }
        rows.push(("Server", self.server_url.clone()));
        if verbose && let Some(error) = &self.error {
            rows.push(("Error", error.clone()));
        }
        rows
    }

    fn print(&self, verbose: bool) {
        println!("\n{}", style("Cartkeep Server Status").bold());
        for (label, value) in self.rows(verbose) {
            println!("  {:<12} {}", style(format!("{label}:")).dim(), value);
        }
        if !self.running {
            println!("\n  {}", style("Start one with: cartkeep start").dim());
        }
        println!();
    }
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let report = Report::gather(&ctx.server_url).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print(ctx.verbose);
    }
    Ok(())
}
