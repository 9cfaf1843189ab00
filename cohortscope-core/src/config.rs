//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/cohortscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/cohortscope/` (~/.config/cohortscope/)
//! - Data/exports: `$XDG_DATA_HOME/cohortscope/` (~/.local/share/cohortscope/)
//! - State/Logs: `$XDG_STATE_HOME/cohortscope/` (~/.local/state/cohortscope/)
//!
//! Everything a report run needs (thresholds, KPI targets, the warehouse
//! column schema, horizons) lives here as one immutable structure. There is
//! deliberately no module-level mutable target table: concurrent runs for
//! different products or date ranges each get their own `Config`.

use crate::aggregate::SchemaMap;
use crate::alert::{KpiTargets, ThresholdConfig};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Alert rule thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Per-product KPI targets
    #[serde(default)]
    pub targets: KpiTargets,

    /// Warehouse column schema for aggregation
    #[serde(default)]
    pub schema: SchemaMap,

    /// Report configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report run configuration
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Horizons to derive ROAS/ARPU for
    #[serde(default = "default_horizons")]
    pub horizons: Vec<String>,

    /// Directory for CSV/JSON exports; defaults to the XDG data dir
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            horizons: default_horizons(),
            export_dir: None,
        }
    }
}

fn default_horizons() -> Vec<String> {
    vec!["d0".to_string(), "d1".to_string(), "d7".to_string()]
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.report.horizons.is_empty() {
            return Err(Error::Config(
                "report.horizons must name at least one horizon".to_string(),
            ));
        }
        if self.schema.group_by.is_empty() {
            return Err(Error::Config(
                "schema.group_by must name at least one column".to_string(),
            ));
        }
        if !self.report.horizons.contains(&self.thresholds.primary_horizon)
            && !self.schema.revenue.contains_key(&self.thresholds.primary_horizon)
        {
            return Err(Error::Config(format!(
                "thresholds.primary_horizon '{}' is not among report.horizons or schema.revenue",
                self.thresholds.primary_horizon
            )));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/cohortscope/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("cohortscope").join("config.toml")
    }

    /// Returns the data directory path (default export destination)
    ///
    /// `$XDG_DATA_HOME/cohortscope/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("cohortscope")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/cohortscope/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("cohortscope")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("cohortscope.log")
    }

    /// Effective export directory for this run.
    pub fn export_dir(&self) -> PathBuf {
        self.report
            .export_dir
            .clone()
            .unwrap_or_else(Self::data_dir)
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
