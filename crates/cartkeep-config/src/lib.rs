//! Configuration system for the Cartkeep cart service.
//!
//! Provides TOML-based configuration with:
//! - `[server]` bind address and port
//! - `[carts]` idle timeout and sweep interval for the cart store
//! - `[logging]` console level and log file output
//! - Layering: user config dir, project-local file, `CARTKEEP_*` env vars
//!
//! CLI flags override whatever this resolves to; that last layer is
//! applied by the binary.

pub mod error;
pub mod sources;
pub mod types;

pub use sources::{
    EnvOverride, Layer, Origin, Outcome, Resolved, Resolver, read_config, user_config_dir,
    user_config_path, write_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
