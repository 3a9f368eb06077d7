//! Configuration for the blue/green deployment watcher
//!
//! Values come from, in increasing precedence: built-in defaults, an optional
//! TOML file, environment variables, and command-line flags (applied by the
//! binary). The resulting `Config` is validated once and then passed by
//! reference into the watcher.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Access log written by the proxy when nothing else is configured
pub const DEFAULT_LOG_FILE: &str = "/var/log/nginx/access.log";

/// Window size below which error-rate estimates get noisy
const RECOMMENDED_MIN_WINDOW: usize = 20;

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Incoming webhook for alerts; unset or empty means log-only alerts
    pub slack_webhook_url: Option<String>,
    /// Error rate, in percent, above which an error-rate alert fires
    pub error_threshold: f64,
    /// Number of most recent requests in the rolling window
    pub window_size: usize,
    /// Minimum seconds between two alerts of the same kind
    pub cooldown_seconds: u64,
    /// Detect and log, but never deliver alerts
    pub maintenance_mode: bool,
    /// Requests that must be in the window before the error rate is evaluated
    pub min_sample_size: usize,
    /// Access log to follow
    pub log_file: PathBuf,
    /// Sleep between polls of the log file, in milliseconds
    pub poll_interval_ms: u64,
    /// Upper bound on a single webhook delivery, in seconds
    pub alert_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slack_webhook_url: None,
            error_threshold: 2.0,
            window_size: 200,
            cooldown_seconds: 300,
            maintenance_mode: false,
            min_sample_size: 20,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            poll_interval_ms: 100,
            alert_timeout_seconds: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Keys missing from the file keep their defaults. Values are not
    /// range-checked here; call `validate` once environment and CLI
    /// overrides have been applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, or
    /// `ConfigError::TomlError` if it is not valid TOML for this structure.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override fields from an environment lookup function
    ///
    /// Recognised variables: `SLACK_WEBHOOK_URL`, `ERROR_RATE_THRESHOLD`,
    /// `WINDOW_SIZE`, `ALERT_COOLDOWN_SEC`, `MAINTENANCE_MODE`,
    /// `MIN_SAMPLE_SIZE`, `LOG_FILE_PATH`, `POLL_INTERVAL_MS`,
    /// `ALERT_TIMEOUT_SEC`. Unset or blank variables leave the field alone,
    /// except `SLACK_WEBHOOK_URL` where blank disables the webhook.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if a numeric variable does not parse.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SLACK_WEBHOOK_URL") {
            let url = url.trim();
            self.slack_webhook_url = (!url.is_empty()).then(|| url.to_string());
        }

        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = value("ERROR_RATE_THRESHOLD") {
            self.error_threshold = parse_var("ERROR_RATE_THRESHOLD", &raw)?;
        }
        if let Some(raw) = value("WINDOW_SIZE") {
            self.window_size = parse_var("WINDOW_SIZE", &raw)?;
        }
        if let Some(raw) = value("ALERT_COOLDOWN_SEC") {
            self.cooldown_seconds = parse_var("ALERT_COOLDOWN_SEC", &raw)?;
        }
        if let Some(raw) = value("MAINTENANCE_MODE") {
            self.maintenance_mode = raw.trim().eq_ignore_ascii_case("true");
        }
        if let Some(raw) = value("MIN_SAMPLE_SIZE") {
            self.min_sample_size = parse_var("MIN_SAMPLE_SIZE", &raw)?;
        }
        if let Some(raw) = value("LOG_FILE_PATH") {
            self.log_file = PathBuf::from(raw.trim());
        }
        if let Some(raw) = value("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_var("POLL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = value("ALERT_TIMEOUT_SEC") {
            self.alert_timeout_seconds = parse_var("ALERT_TIMEOUT_SEC", &raw)?;
        }
        Ok(())
    }

    /// Check that every value is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.error_threshold.is_finite() || self.error_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "error_threshold must be a positive percentage, got {}",
                self.error_threshold
            )));
        }
        if self.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.min_sample_size == 0 {
            return Err(ConfigError::ValidationError(
                "min_sample_size must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.alert_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "alert_timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings that are valid but probably not what the operator wants
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.window_size < RECOMMENDED_MIN_WINDOW {
            warnings.push(format!(
                "window_size {} is below the recommended minimum of {}",
                self.window_size, RECOMMENDED_MIN_WINDOW
            ));
        }
        if self.min_sample_size > self.window_size {
            warnings.push(format!(
                "min_sample_size {} exceeds window_size {}; error-rate alerts can never fire",
                self.min_sample_size, self.window_size
            ));
        }
        warnings
    }

    /// Webhook URL, if one is configured and non-empty
    pub fn webhook_url(&self) -> Option<&str> {
        self.slack_webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_seconds)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::ParseError(format!("{}={:?}: {}", key, raw, e)))
}
