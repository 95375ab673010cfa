//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/shelfwise/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/shelfwise/` (~/.config/shelfwise/)
//! - Data: `$XDG_DATA_HOME/shelfwise/` (~/.local/share/shelfwise/)
//! - State/Logs: `$XDG_STATE_HOME/shelfwise/` (~/.local/state/shelfwise/)

use crate::analytics::BaselinePolicy;
use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Rolling log file name parts, `<prefix>.<date>.<suffix>`.
pub(crate) const LOG_FILE_PREFIX: &str = "shelfwise";
pub(crate) const LOG_FILE_SUFFIX: &str = "log";

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
    /// Document store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Report generation settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Notification dispatch endpoint
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which document store backend to talk to
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON snapshot file on disk
    #[default]
    Snapshot,
    /// Remote document gateway over HTTP
    Http,
}

/// Document store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Snapshot file (defaults to `$XDG_DATA_HOME/shelfwise/snapshot.json`)
    pub snapshot_path: Option<PathBuf>,

    /// Gateway base URL, required for `kind = "http"`
    pub base_url: Option<String>,

    /// Bearer token for the gateway
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on concurrent catalog lookups during a join
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            snapshot_path: None,
            base_url: None,
            api_key: None,
            timeout_secs: default_store_timeout(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
        }
    }
}

impl StoreConfig {
    /// Snapshot path, falling back to the data directory.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("snapshot.json"))
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.kind == StoreKind::Http && self.base_url.is_none() {
            return Err(Error::Config(
                "store.base_url is required when store.kind = \"http\"".to_string(),
            ));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(Error::Config(
                "store.max_concurrent_lookups must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_store_timeout() -> u64 {
    30
}

fn default_max_concurrent_lookups() -> usize {
    8
}

/// How the weekly fines baseline is built
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaselineKind {
    /// Same aggregate, shifted back by `baseline_shift_days`
    #[default]
    Shifted,
    /// Current values multiplied by `baseline_scale`
    Scaled,
}

/// Analytics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub baseline: BaselineKind,

    #[serde(default = "default_baseline_shift_days")]
    pub baseline_shift_days: i64,

    #[serde(default = "default_baseline_scale")]
    pub baseline_scale: f64,

    /// Days covered by the weekly fine total (inclusive of today)
    #[serde(default = "default_weekly_window_days")]
    pub weekly_window_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineKind::default(),
            baseline_shift_days: default_baseline_shift_days(),
            baseline_scale: default_baseline_scale(),
            weekly_window_days: default_weekly_window_days(),
        }
    }
}

impl AnalyticsConfig {
    /// Resolve the configured baseline into a policy value.
    pub fn baseline_policy(&self) -> BaselinePolicy {
        match self.baseline {
            BaselineKind::Shifted => BaselinePolicy::ShiftedDays(self.baseline_shift_days),
            BaselineKind::Scaled => BaselinePolicy::Scaled(self.baseline_scale),
        }
    }
}

fn default_baseline_shift_days() -> i64 {
    7
}

fn default_baseline_scale() -> f64 {
    0.9
}

fn default_weekly_window_days() -> i64 {
    7
}

/// Notification dispatch configuration
///
/// When no endpoint is configured, broadcasts are only logged.
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Dispatch endpoint URL (e.g., `https://push.example.com/v1/notifications`)
    pub endpoint: Option<String>,

    /// Bearer token for the dispatch endpoint
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_notification_max_retries")]
    pub max_retries: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_notification_timeout(),
            max_retries: default_notification_max_retries(),
        }
    }
}

fn default_notification_timeout() -> u64 {
    30
}

fn default_notification_max_retries() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.store.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/shelfwise/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("shelfwise").join("config.toml")
    }

    /// `$XDG_DATA_HOME/shelfwise/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("shelfwise")
    }

    /// `$XDG_STATE_HOME/shelfwise/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("shelfwise")
    }

    /// Log file the daily appender is writing to right now.
    ///
    /// Rotation is keyed on the UTC date: `shelfwise.YYYY-MM-DD.log`.
    pub fn log_path() -> PathBuf {
        Self::log_path_for(Utc::now().date_naive())
    }

    /// `$XDG_STATE_HOME/shelfwise/shelfwise.YYYY-MM-DD.log`
    pub fn log_path_for(day: NaiveDate) -> PathBuf {
        Self::state_dir().join(format!(
            "{}.{}.{}",
            LOG_FILE_PREFIX,
            day.format("%Y-%m-%d"),
            LOG_FILE_SUFFIX
        ))
    }
}
