//! keyproxy entry point.
//!
//! Relays keys typed into this terminal to a BLE HID keyboard peripheral.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::parse() + load_config()     -- settings
//!  └─ Supervisor::run()
//!       ├─ spawn_sender()    (Tokio task: scan, connect, transmit, keepalive)
//!       ├─ KeyboardCapturer  (this task: terminal keys -> event queue)
//!       └─ shutdown_signal() (Ctrl+C / SIGTERM / SIGHUP)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keyproxy::application::capture_keys::ExitReason;
use keyproxy::application::supervise::{shutdown_signal, ShutdownReason, Supervisor};
use keyproxy::infrastructure::input_capture::terminal::TerminalInput;
use keyproxy::infrastructure::storage::config::{load_config, AppConfig, LogLevel, Overrides};
use keyproxy_sender::spawn_sender;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Relays keyboard input to a BLE HID keyboard peripheral.
///
/// Keys typed into the terminal are queued and sent to the peripheral named on
/// the command line. Press Ctrl+] to quit.
#[derive(Debug, Parser)]
#[command(
    name = "keyproxy",
    about = "Relays keyboard input to a BLE HID keyboard peripheral",
    version
)]
struct Cli {
    /// Advertised name of the peripheral (exact, case-sensitive).
    #[arg(value_name = "NAME", env = "KEYPROXY_DEVICE_NAME")]
    device_name: Option<String>,

    /// Same as the positional NAME.
    #[arg(long = "device-name", value_name = "NAME", conflicts_with = "device_name")]
    device_name_flag: Option<String>,

    /// Log verbosity [default: info]. `RUST_LOG` takes precedence when set.
    #[arg(long, value_enum, env = "KEYPROXY_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Sender transmit tick in milliseconds [default: 10].
    #[arg(long, value_name = "MS", env = "KEYPROXY_SENDER_INTERVAL")]
    sender_interval: Option<u64>,

    /// Capture loop tick in milliseconds [default: 50].
    #[arg(long, value_name = "MS", env = "KEYPROXY_CAPTURE_DELAY")]
    capture_delay: Option<u64>,

    /// Length of one BLE scan window in seconds [default: 60].
    #[arg(long, value_name = "SECS", env = "KEYPROXY_SCAN_TIMEOUT")]
    scan_timeout: Option<u64>,

    /// Optional TOML configuration file. Flags override its values.
    #[arg(long, value_name = "PATH", env = "KEYPROXY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (if any) and applies the flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged settings fail validation.
    fn into_app_config(self) -> anyhow::Result<AppConfig> {
        let file = load_config(self.config.as_deref())
            .with_context(|| format!("failed to load config file {:?}", self.config))?;
        let overrides = Overrides {
            device_name: self.device_name.or(self.device_name_flag),
            log_level: self.log_level,
            sender_interval_ms: self.sender_interval,
            capture_delay_ms: self.capture_delay,
            scan_timeout_secs: self.scan_timeout,
        };
        Ok(AppConfig::resolve(file, overrides)?)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Cli::parse().into_app_config()?;

    // Logs go to stderr; stdout carries the overlay line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .init();

    info!(
        "keyproxy starting (device {:?}, sender every {:?}, capture every {:?})",
        config.device_name, config.sender_interval, config.capture_delay
    );

    let input = TerminalInput::new().context("keyproxy must be run from an interactive terminal")?;
    let sender_config = config.sender_config();

    let reason = Supervisor::new(config.capture_delay)
        .run(
            Box::new(input),
            move |queue| spawn_sender(sender_config, queue),
            shutdown_signal(),
        )
        .await;

    info!("keyproxy stopped: {reason:?}");
    Ok(match reason {
        ShutdownReason::Interrupted | ShutdownReason::Capture(ExitReason::WindowClosed) => {
            ExitCode::SUCCESS
        }
        ShutdownReason::Capture(ExitReason::SenderDied | ExitReason::InputFailed(_)) => {
            ExitCode::FAILURE
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_positional_device_name() {
        // Arrange / Act
        let cli = Cli::parse_from(["keyproxy", "Flipper"]);

        // Assert
        assert_eq!(cli.device_name.as_deref(), Some("Flipper"));
    }

    #[test]
    fn test_device_name_flag() {
        let cli = Cli::parse_from(["keyproxy", "--device-name", "Flipper"]);

        let config = cli.into_app_config().unwrap();

        assert_eq!(config.device_name, "Flipper");
    }

    #[test]
    fn test_positional_and_flag_conflict() {
        let result = Cli::try_parse_from(["keyproxy", "A", "--device-name", "B"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_flags_reach_app_config() {
        // Arrange
        let cli = Cli::parse_from([
            "keyproxy",
            "Flipper",
            "--log-level",
            "critical",
            "--sender-interval",
            "20",
            "--capture-delay",
            "30",
            "--scan-timeout",
            "5",
        ]);

        // Act
        let config = cli.into_app_config().unwrap();

        // Assert
        assert_eq!(config.log_level, LogLevel::Critical);
        assert_eq!(config.sender_interval, Duration::from_millis(20));
        assert_eq!(config.capture_delay, Duration::from_millis(30));
        assert_eq!(config.scan_window, Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let result = Cli::try_parse_from(["keyproxy", "Flipper", "--log-level", "trace"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let cli = Cli::parse_from(["keyproxy", "Flipper", "--sender-interval", "0"]);

        assert!(cli.into_app_config().is_err());
    }
}
