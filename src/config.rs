//! Configuration for export runs.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command-line flags. The resolved [`Config`] is
//! validated once before a run starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dedup::Strictness;
use crate::window::TimeWindow;

/// Accepted formats for explicit range bounds.
const RANGE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Conversation (group or contact) to export
    #[serde(default = "default_conversation")]
    pub conversation: String,

    /// Class name of the WeChat main window
    #[serde(default = "default_window_class")]
    pub window_class: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            conversation: default_conversation(),
            window_class: default_window_class(),
        }
    }
}

/// Time window to export. `start`/`end` take precedence over `hours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Rolling window: the last N hours
    #[serde(default = "default_hours")]
    pub hours: u32,

    /// Explicit range start, `YYYY-MM-DD HH:MM[:SS]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Explicit range end, `YYYY-MM-DD HH:MM[:SS]`; defaults to now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            hours: default_hours(),
            start: None,
            end: None,
        }
    }
}

/// How the list is asked for older messages when no load-more button shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMethod {
    /// Press PageUp on the focused list
    #[default]
    PageUp,
    /// Drag the scrollbar from near the bottom of the list upward
    Drag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after each load attempt (ms)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Consecutive loads without new lines before giving up
    #[serde(default = "default_stall_limit")]
    pub stall_limit: u32,

    #[serde(default)]
    pub scroll_method: ScrollMethod,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            settle_ms: default_settle_ms(),
            stall_limit: default_stall_limit(),
            scroll_method: ScrollMethod::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait after focus and keystrokes (ms)
    #[serde(default = "default_action_settle_ms")]
    pub action_settle_ms: u64,

    /// Wait after submitting the conversation search (ms)
    #[serde(default = "default_search_settle_ms")]
    pub search_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_settle_ms: default_action_settle_ms(),
            search_settle_ms: default_search_settle_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub strictness: Strictness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_conversation() -> String {
    "A旗舰船队".to_string()
}

fn default_window_class() -> String {
    "WeChatMainWndForPC".to_string()
}

fn default_hours() -> u32 {
    14
}

fn default_max_attempts() -> u32 {
    50
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_stall_limit() -> u32 {
    3
}

fn default_action_settle_ms() -> u64 {
    1000
}

fn default_search_settle_ms() -> u64 {
    3000
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Values given on the command line. `None` leaves the setting alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub conversation: Option<String>,
    pub hours: Option<u32>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub max_attempts: Option<u32>,
    pub export_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub strictness: Option<Strictness>,
}

impl Config {
    /// Load from a TOML file. A missing file is an error here; callers that
    /// want defaults simply don't pass a path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("[WX-EXPORT] loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Recognised variables: `TARGET_GROUP`, `WECHAT_WINDOW_CLASS`,
    /// `MESSAGE_TIME_RANGE` (hours), `MESSAGE_START_TIME`, `MESSAGE_END_TIME`,
    /// `MAX_SCROLL_ATTEMPTS`, `SCROLL_WAIT_TIME` (seconds),
    /// `DEDUP_STRICTNESS`, `EXPORT_PATH`, `LOG_PATH`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TARGET_GROUP") {
            self.target.conversation = v;
        }
        if let Some(v) = get("WECHAT_WINDOW_CLASS") {
            self.target.window_class = v;
        }
        if let Some(v) = get("MESSAGE_TIME_RANGE") {
            self.window.hours = parse_number("MESSAGE_TIME_RANGE", &v)?;
        }
        if let Some(v) = get("MESSAGE_START_TIME") {
            self.window.start = Some(v);
        }
        if let Some(v) = get("MESSAGE_END_TIME") {
            self.window.end = Some(v);
        }
        if let Some(v) = get("MAX_SCROLL_ATTEMPTS") {
            self.pagination.max_attempts = parse_number("MAX_SCROLL_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("SCROLL_WAIT_TIME") {
            let seconds: f64 = parse_number("SCROLL_WAIT_TIME", &v)?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "SCROLL_WAIT_TIME must be a non-negative number of seconds, got '{}'",
                    v
                )));
            }
            self.pagination.settle_ms = (seconds * 1000.0).round() as u64;
        }
        if let Some(v) = get("DEDUP_STRICTNESS") {
            self.dedup.strictness = v.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(v) = get("EXPORT_PATH") {
            self.output.export_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_PATH") {
            self.output.log_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(v) = overrides.conversation {
            self.target.conversation = v;
        }
        if let Some(v) = overrides.hours {
            self.window.hours = v;
        }
        if let Some(v) = overrides.start {
            self.window.start = Some(v);
        }
        if let Some(v) = overrides.end {
            self.window.end = Some(v);
        }
        if let Some(v) = overrides.max_attempts {
            self.pagination.max_attempts = v;
        }
        if let Some(v) = overrides.export_dir {
            self.output.export_dir = v;
        }
        if let Some(v) = overrides.log_dir {
            self.output.log_dir = v;
        }
        if let Some(v) = overrides.strictness {
            self.dedup.strictness = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.conversation.trim().is_empty() {
            return Err(ConfigError::Invalid("conversation must not be empty".into()));
        }
        if self.pagination.max_attempts < 1 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.window.hours < 1 {
            return Err(ConfigError::Invalid("hours must be at least 1".into()));
        }
        let (start, end) = self.explicit_range()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "window start {} is after window end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    fn explicit_range(&self) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), ConfigError> {
        let start = self.window.start.as_deref().map(parse_range_bound).transpose()?;
        let end = self.window.end.as_deref().map(parse_range_bound).transpose()?;
        Ok((start, end))
    }

    /// The window to export for a run starting at `now`.
    ///
    /// An explicit range (either bound set) wins over the rolling window.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` for an unparseable bound, or for an `hours`
    /// value reaching before the earliest representable date.
    pub fn resolve_window(&self, now: NaiveDateTime) -> Result<TimeWindow, ConfigError> {
        match self.explicit_range()? {
            (None, None) => TimeWindow::last_hours(self.window.hours, now).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "hours {} reaches before the earliest supported date",
                    self.window.hours
                ))
            }),
            (start, end) => Ok(TimeWindow::range(start, end, now)),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.pagination.settle_ms)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.timing.action_settle_ms)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.timing.search_settle_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, value)))
}

/// Parse `YYYY-MM-DD HH:MM[:SS]`.
///
/// # Examples
///
/// ```
/// use wechat_exporter::config::parse_range_bound;
///
/// assert_eq!(parse_range_bound("2025-04-10 09:30").unwrap().to_string(), "2025-04-10 09:30:00");
/// assert!(parse_range_bound("yesterday").is_err());
/// ```
pub fn parse_range_bound(value: &str) -> Result<NaiveDateTime, ConfigError> {
    let value = value.trim();
    RANGE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "'{}' is not a valid time (expected YYYY-MM-DD HH:MM[:SS])",
                value
            ))
        })
}
