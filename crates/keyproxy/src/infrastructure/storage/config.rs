//! TOML configuration file and the settings resolved from it.
//!
//! Settings come from three places, strongest first:
//!
//! 1. command-line flags (and their `KEYPROXY_*` environment variables);
//! 2. the optional `--config` file;
//! 3. built-in defaults.
//!
//! Example file:
//!
//! ```toml
//! device_name = "Flipper Zero"
//! log_level = "debug"
//! sender_interval_ms = 10
//! capture_delay_ms = 50
//! scan_timeout_secs = 60
//! ```
//!
//! Every key is optional. Fields annotated with `#[serde(default = "...")]`
//! take the helper's value when absent, so an empty file is valid (although
//! the device name must then come from the command line).

use std::path::{Path, PathBuf};
use std::time::Duration;

use keyproxy_sender::SenderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Neither the command line nor the file named a device.
    #[error("no device name given (pass it as an argument or set device_name in the config file)")]
    MissingDeviceName,

    /// The device name is empty or only whitespace.
    #[error("device name must not be empty")]
    EmptyDeviceName,

    /// An interval that drives a timer was zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

// ── Log level ─────────────────────────────────────────────────────────────────

/// User-facing log level names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    ///
    /// `tracing` has no level above `error`, so `critical` shares it.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// Contents of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    /// Advertised name of the peripheral.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    /// Sender transmit tick in milliseconds.
    #[serde(default = "default_sender_interval_ms")]
    pub sender_interval_ms: u64,
    /// Capture loop tick in milliseconds.
    #[serde(default = "default_capture_delay_ms")]
    pub capture_delay_ms: u64,
    /// Length of one BLE scan window in seconds.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
}

fn default_sender_interval_ms() -> u64 {
    10
}
fn default_capture_delay_ms() -> u64 {
    50
}
fn default_scan_timeout_secs() -> u64 {
    60
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            log_level: LogLevel::default(),
            sender_interval_ms: default_sender_interval_ms(),
            capture_delay_ms: default_capture_delay_ms(),
            scan_timeout_secs: default_scan_timeout_secs(),
        }
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub device_name: Option<String>,
    pub log_level: Option<LogLevel>,
    pub sender_interval_ms: Option<u64>,
    pub capture_delay_ms: Option<u64>,
    pub scan_timeout_secs: Option<u64>,
}

// ── Resolved settings ─────────────────────────────────────────────────────────

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub device_name: String,
    pub log_level: LogLevel,
    pub sender_interval: Duration,
    pub capture_delay: Duration,
    pub scan_window: Duration,
}

impl AppConfig {
    /// Applies `overrides` on top of `file` and validates the result.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingDeviceName`] / [`ConfigError::EmptyDeviceName`]
    ///   if no usable device name was given.
    /// - [`ConfigError::ZeroInterval`] if any interval is zero.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let device_name = overrides
            .device_name
            .or(file.device_name)
            .ok_or(ConfigError::MissingDeviceName)?;
        if device_name.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }

        let sender_interval_ms = overrides
            .sender_interval_ms
            .unwrap_or(file.sender_interval_ms);
        let capture_delay_ms = overrides.capture_delay_ms.unwrap_or(file.capture_delay_ms);
        let scan_timeout_secs = overrides.scan_timeout_secs.unwrap_or(file.scan_timeout_secs);

        Ok(Self {
            device_name,
            log_level: overrides.log_level.unwrap_or(file.log_level),
            sender_interval: Duration::from_millis(non_zero("sender interval", sender_interval_ms)?),
            capture_delay: Duration::from_millis(non_zero("capture delay", capture_delay_ms)?),
            scan_window: Duration::from_secs(non_zero("scan timeout", scan_timeout_secs)?),
        })
    }

    /// Settings handed to the sender task.
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            device_name: self.device_name.clone(),
            transmit_interval: self.sender_interval,
            scan_window: self.scan_window,
        }
    }
}

fn non_zero(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroInterval(name))
    } else {
        Ok(value)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads the configuration file at `path`, or the defaults when no path is
/// given.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist), and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
