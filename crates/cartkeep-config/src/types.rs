//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 8080
//!
//! [carts]
//! idle_timeout_secs = 600
//! sweep_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! file = true
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use cartkeep_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartkeepConfig {
    /// HTTP server settings.
    pub server: Option<ServerSection>,

    /// Cart store settings.
    pub carts: Option<CartsSection>,

    /// Logging settings.
    pub logging: Option<LoggingSection>,
}

impl CartkeepConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Config with every section filled in with defaults, for `config init`.
    pub fn with_defaults() -> Self {
        Self {
            server: Some(ServerSection::default()),
            carts: Some(CartsSection::default()),
            logging: Some(LoggingSection::default()),
        }
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: CartkeepConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.carts.is_some() {
            self.carts = other.carts;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Server section, or defaults if absent.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// Carts section, or defaults if absent.
    pub fn carts(&self) -> CartsSection {
        self.carts.clone().unwrap_or_default()
    }

    /// Logging section, or defaults if absent.
    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }

    /// Check value ranges across all sections.
    pub fn validate(&self) -> Result<()> {
        self.server().socket_addr()?;
        self.carts().validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSection {
    /// Resolve `bind` and `port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|_| ConfigError::Invalid {
            field: "server.bind".to_string(),
            reason: format!("'{}' is not an IP address", self.bind),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Carts
// ─────────────────────────────────────────────────────────────────────────────

/// Cart store configuration.
///
/// Carts untouched for `idle_timeout_secs` are evicted by a sweep that runs
/// every `sweep_interval_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartsSection {
    /// Idle time in seconds after which a cart is evicted.
    pub idle_timeout_secs: u64,
    /// Seconds between sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for CartsSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: cartkeep_store::DEFAULT_IDLE_TIMEOUT.as_secs(),
            sweep_interval_secs: cartkeep_store::DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl CartsSection {
    /// Idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Both durations must be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "carts.idle_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "carts.sweep_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Build the cart store configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with_idle_timeout(self.idle_timeout())
            .with_sweep_interval(self.sweep_interval())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Console log level for cartkeep crates (`trace` .. `error`).
    pub level: String,
    /// Write a daily-rolling JSON log file under the config directory.
    pub file: bool,
    /// Emit console output as JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            json: false,
        }
    }
}
