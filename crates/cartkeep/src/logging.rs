//! Tracing setup: a console layer plus an optional daily-rolling JSON file.

use std::path::PathBuf;

use cartkeep_config::{LoggingSection, Resolver};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

const CRATES: [&str; 4] = ["cartkeep", "cartkeep_config", "cartkeep_server", "cartkeep_store"];

/// Build a filter directive that sets `level` for our crates and `fallback`
/// for everything else.
fn directives(level: &str, fallback: &str) -> String {
    let mut parts: Vec<String> = CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect();
    parts.push(format!("tower_http={level}"));
    parts.push(fallback.to_string());
    parts.join(",")
}

/// The `[logging]` section in effect for this run.
///
/// `explicit` is the `--config` file, if any. Config errors fall back to
/// defaults here; the command reports them itself once logging is up.
pub fn section(resolver: Resolver, explicit: Option<PathBuf>) -> LoggingSection {
    resolver
        .explicit_file(explicit)
        .resolve()
        .map(|resolved| resolved.config.logging())
        .unwrap_or_default()
}

/// Console filter: `RUST_LOG` wins, then `--verbose`, then the configured level.
fn console_filter(verbose: bool, logging: &LoggingSection) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if verbose { "debug" } else { logging.level.as_str() };
    EnvFilter::try_new(directives(level, "warn"))
        .unwrap_or_else(|_| EnvFilter::new(directives("info", "warn")))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub fn init(verbose: bool, logging: &LoggingSection) -> Option<WorkerGuard> {
    let console = if logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter(verbose, logging))
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(console_filter(verbose, logging))
            .boxed()
    };

    let (file, guard) = match file_writer(logging) {
        Some((writer, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(directives("trace", "info")));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

fn file_writer(
    logging: &LoggingSection,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !logging.file {
        return None;
    }

    let log_dir = cartkeep_config::user_config_dir()?.join("logs");
    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("cartkeep")
        .filename_suffix("log")
        .build(&log_dir)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!(
                "warning: file logging disabled, cannot open {}: {}",
                log_dir.display(),
                e
            );
            None
        }
    }
}
