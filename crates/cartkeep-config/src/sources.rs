//! Resolving the effective configuration from files and the environment.
//!
//! Precedence, lowest first:
//! 1. `config.toml` in the user config dir (`~/.config/cartkeep` on Linux)
//! 2. `./cartkeep.toml`, or a single file given with `--config` instead of
//!    both file layers
//! 3. `CARTKEEP_IDLE_TIMEOUT_SECS`, `CARTKEEP_SWEEP_INTERVAL_SECS` and
//!    `CARTKEEP_LOG_LEVEL`
//!
//! CLI flags sit above all of these and are applied by the binary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{CartkeepConfig, ConfigError, Result};

/// Project-local config filename.
pub const PROJECT_FILE: &str = "cartkeep.toml";

/// Overrides the user config directory. Also moves the log directory.
pub const CONFIG_DIR_ENV: &str = "CARTKEEP_CONFIG_DIR";

const USER_FILE: &str = "config.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Environment overrides
// ─────────────────────────────────────────────────────────────────────────────

/// A single setting that can be overridden from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOverride {
    IdleTimeout,
    SweepInterval,
    LogLevel,
}

impl EnvOverride {
    pub const ALL: [EnvOverride; 3] = [
        EnvOverride::IdleTimeout,
        EnvOverride::SweepInterval,
        EnvOverride::LogLevel,
    ];

    /// Name of the environment variable.
    pub fn var(self) -> &'static str {
        match self {
            EnvOverride::IdleTimeout => "CARTKEEP_IDLE_TIMEOUT_SECS",
            EnvOverride::SweepInterval => "CARTKEEP_SWEEP_INTERVAL_SECS",
            EnvOverride::LogLevel => "CARTKEEP_LOG_LEVEL",
        }
    }

    fn apply(self, config: &mut CartkeepConfig, raw: &str) -> Outcome {
        let raw = raw.trim();

        if self == EnvOverride::LogLevel {
            if raw.is_empty() {
                return Outcome::Rejected("empty log level".to_string());
            }
            let mut logging = config.logging();
            logging.level = raw.to_string();
            config.logging = Some(logging);
            return Outcome::Applied;
        }

        let secs = match raw.parse::<u64>() {
            Ok(secs) => secs,
            Err(_) => return Outcome::Rejected(format!("expected whole seconds, got {raw:?}")),
        };
        let mut carts = config.carts();
        match self {
            EnvOverride::IdleTimeout => carts.idle_timeout_secs = secs,
            _ => carts.sweep_interval_secs = secs,
        }
        config.carts = Some(carts);
        Outcome::Applied
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution report
// ─────────────────────────────────────────────────────────────────────────────

/// Where a layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    UserFile(PathBuf),
    ProjectFile(PathBuf),
    ExplicitFile(PathBuf),
    Env(EnvOverride),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::UserFile(path) | Origin::ProjectFile(path) | Origin::ExplicitFile(path) => {
                write!(f, "{}", path.display())
            }
            Origin::Env(var) => write!(f, "${}", var.var()),
        }
    }
}

/// What happened when a layer was considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The file does not exist.
    Absent,
    /// Present but unusable; lower layers stay in effect.
    Rejected(String),
}

/// One considered layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub origin: Origin,
    pub outcome: Outcome,
}

/// The effective configuration plus a record of every layer considered.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: CartkeepConfig,
    pub layers: Vec<Layer>,
}

impl Resolved {
    /// Layers that contributed to `config`.
    pub fn applied(&self) -> impl Iterator<Item = &Origin> {
        self.layers
            .iter()
            .filter(|l| l.outcome == Outcome::Applied)
            .map(|l| &l.origin)
    }

    /// Human-readable warnings for rejected layers.
    pub fn warnings(&self) -> Vec<String> {
        self.layers
            .iter()
            .filter_map(|l| match &l.outcome {
                Outcome::Rejected(reason) => Some(format!("ignored {}: {}", l.origin, reason)),
                _ => None,
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a [`Resolved`] config.
///
/// [`Resolver::default`] sees no user directory and no environment, which
/// keeps tests hermetic. [`Resolver::from_process`] reads both.
#[derive(Debug, Clone)]
pub struct Resolver {
    user_dir: Option<PathBuf>,
    project_dir: PathBuf,
    explicit: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            user_dir: None,
            project_dir: PathBuf::from("."),
            explicit: None,
            env: BTreeMap::new(),
        }
    }
}

impl Resolver {
    /// Resolver over the real user config dir, cwd and process environment.
    pub fn from_process() -> Self {
        let env = EnvOverride::ALL
            .iter()
            .filter_map(|o| std::env::var(o.var()).ok().map(|v| (o.var().to_string(), v)))
            .collect();
        Self {
            user_dir: user_config_dir(),
            env,
            ..Self::default()
        }
    }

    pub fn user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Read only this file instead of the user and project files.
    ///
    /// Unlike discovered files, an explicit file must exist and parse.
    pub fn explicit_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn env(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(var.into(), value.into());
        self
    }

    pub fn resolve(&self) -> Result<Resolved> {
        let mut config = CartkeepConfig::new();
        let mut layers = Vec::new();

        match &self.explicit {
            Some(path) => {
                config.merge(read_config(path)?);
                layers.push(Layer {
                    origin: Origin::ExplicitFile(path.clone()),
                    outcome: Outcome::Applied,
                });
            }
            None => {
                if let Some(dir) = &self.user_dir {
                    let path = dir.join(USER_FILE);
                    let outcome = merge_file(&mut config, &path);
                    layers.push(Layer {
                        origin: Origin::UserFile(path),
                        outcome,
                    });
                }
                let path = self.project_dir.join(PROJECT_FILE);
                let outcome = merge_file(&mut config, &path);
                layers.push(Layer {
                    origin: Origin::ProjectFile(path),
                    outcome,
                });
            }
        }

        for over in EnvOverride::ALL {
            if let Some(raw) = self.env.get(over.var()) {
                layers.push(Layer {
                    origin: Origin::Env(over),
                    outcome: over.apply(&mut config, raw),
                });
            }
        }

        Ok(Resolved { config, layers })
    }
}

fn merge_file(config: &mut CartkeepConfig, path: &Path) -> Outcome {
    if !path.is_file() {
        return Outcome::Absent;
    }
    match read_config(path) {
        Ok(layer) => {
            config.merge(layer);
            Outcome::Applied
        }
        Err(e) => Outcome::Rejected(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse one config file.
pub fn read_config(path: &Path) -> Result<CartkeepConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    CartkeepConfig::from_toml(&text)
}

/// Write `config` to `path`, creating missing parent directories.
pub fn write_config(config: &CartkeepConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let text = config.to_toml()?;
    std::fs::write(path, text).map_err(|source| ConfigError::WriteFile {
        path: path.display().to_string(),
        source,
    })
}

/// `$CARTKEEP_CONFIG_DIR`, else the platform config dir plus `cartkeep`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("cartkeep")),
    }
}

/// The user config file, whether or not it exists.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_FILE))
}
