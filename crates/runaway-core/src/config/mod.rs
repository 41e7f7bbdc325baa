//! Configuration loading for the runaway detector.
//!
//! One TOML file with a `[sampling]` and a `[fleet]` table. Every key is
//! optional. Resolution order (highest to lowest priority):
//! 1. `--config PATH`
//! 2. `RUNAWAY_CONFIG`
//! 3. `$XDG_CONFIG_HOME/runaway/config.toml`
//! 4. Built-in defaults
//!
//! The decision thresholds are not configurable.

use crate::logging::event_names;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming a config file.
pub const ENV_CONFIG_PATH: &str = "RUNAWAY_CONFIG";

/// Application directory under the XDG config home.
const APP_NAME: &str = "runaway";

const CONFIG_FILENAME: &str = "config.toml";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl From<ConfigError> for runaway_common::Error {
    fn from(err: ConfigError) -> Self {
        runaway_common::Error::Config(err.to_string())
    }
}

/// Local sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// I/O-wait sampling window in milliseconds.
    pub iowait_window_ms: u64,
    /// Timeout for each external metric command.
    pub command_timeout_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            iowait_window_ms: 1000,
            command_timeout_secs: 10,
        }
    }
}

impl SamplingConfig {
    pub fn iowait_window(&self) -> Duration {
        Duration::from_millis(self.iowait_window_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Fleet fan-out settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Binary invoked on each remote host.
    pub remote_binary: String,
    /// Host group inventory file (TOML, YAML or JSON).
    pub inventory: Option<PathBuf>,
    /// Hosts matching this regex are skipped when `--exclude` is given.
    pub exclude_pattern: String,
    pub connect_timeout_secs: u64,
    /// Wall-clock limit for one host's whole check.
    pub command_timeout_secs: u64,
    /// Concurrent hosts; 0 is unbounded.
    pub parallel: usize,
    pub ssh_user: Option<String>,
    pub ssh_port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    /// Extra `-o` options passed to ssh.
    pub ssh_options: Vec<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            remote_binary: "runaway".to_string(),
            inventory: None,
            exclude_pattern: "^(login|head)".to_string(),
            connect_timeout_secs: 10,
            command_timeout_secs: 120,
            parallel: 0,
            ssh_user: None,
            ssh_port: None,
            identity_file: None,
            ssh_options: vec![
                "BatchMode=yes".to_string(),
                "StrictHostKeyChecking=accept-new".to_string(),
            ],
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunawayConfig {
    pub sampling: SamplingConfig,
    pub fleet: FleetConfig,
}

impl RunawayConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: RunawayConfig = toml::from_str(text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.iowait_window_ms == 0 || self.sampling.iowait_window_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "sampling.iowait_window_ms",
                message: format!("{} is outside 1..=60000", self.sampling.iowait_window_ms),
            });
        }
        if self.sampling.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.command_timeout_secs",
                message: "must be positive".to_string(),
            });
        }
        if self.fleet.remote_binary.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "fleet.remote_binary",
                message: "must not be empty".to_string(),
            });
        }
        if self.fleet.command_timeout_secs == 0 || self.fleet.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fleet.command_timeout_secs",
                message: "fleet timeouts must be positive".to_string(),
            });
        }
        if let Err(e) = regex::Regex::new(&self.fleet.exclude_pattern) {
            return Err(ConfigError::Invalid {
                field: "fleet.exclude_pattern",
                message: e.to_string(),
            });
        }
        Ok(())
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub config: RunawayConfig,
    pub source: ConfigSource,
    /// Path to the file (None if using defaults).
    pub path: Option<PathBuf>,
    /// SHA-256 of the file content (None if using defaults).
    pub sha256: Option<String>,
}

impl ResolvedConfig {
    pub fn defaults() -> Self {
        Self {
            config: RunawayConfig::default(),
            source: ConfigSource::BuiltinDefault,
            path: None,
            sha256: None,
        }
    }
}

/// Load configuration with the standard resolution order.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let xdg = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|dir| dir.join(APP_NAME).join(CONFIG_FILENAME));
    load_config_from(cli_path, std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from), xdg)
}

/// Resolution with the environment and XDG lookups already done.
///
/// An explicitly named file must exist and parse. The implicit XDG file is
/// optional, and a broken one only produces a warning.
pub fn load_config_from(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    xdg_path: Option<PathBuf>,
) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = cli_path {
        return load_file(path, ConfigSource::CliArgument);
    }
    if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
        return load_file(&path, ConfigSource::Environment);
    }
    if let Some(path) = xdg_path.filter(|p| p.exists()) {
        return match load_file(&path, ConfigSource::XdgConfig) {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                warn!(
                    event = event_names::CONFIG_ERROR,
                    path = %path.display(),
                    error = %e,
                    "ignoring broken config file, using defaults"
                );
                Ok(ResolvedConfig::defaults())
            }
        };
    }

    debug!(event = event_names::CONFIG_DEFAULT_USED, "no config file, using defaults");
    Ok(ResolvedConfig::defaults())
}

fn load_file(path: &Path, source: ConfigSource) -> Result<ResolvedConfig, ConfigError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let text = String::from_utf8_lossy(&bytes);
    let config = RunawayConfig::from_toml(&text, path)?;

    info!(
        event = event_names::CONFIG_LOADED,
        path = %path.display(),
        source = %source,
        sha256 = %sha256,
        "configuration loaded"
    );

    Ok(ResolvedConfig {
        config,
        source,
        path: Some(path.to_path_buf()),
        sha256: Some(sha256),
    })
}
