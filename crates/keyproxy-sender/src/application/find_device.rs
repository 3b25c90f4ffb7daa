//! DeviceFinder: scans until the target peripheral is seen.
//!
//! The finder issues a bounded scan and watches `DeviceDiscovered`
//! notifications for a peripheral whose advertised name equals the configured
//! name exactly (case-sensitive). The first match wins: the scan is stopped,
//! the record is handed to the caller once, and every later scan notification
//! is ignored.
//!
//! A scan window that elapses without a match is not an error. The finder
//! logs it and starts the next scan immediately, forever. A scan that the
//! stack reports as failed is fatal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::ble::{BleCentral, BleError, BleEvent, PeripheralRecord};

/// Default length of one scan window.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(60);

/// Errors that end discovery.
#[derive(Debug, Error, PartialEq)]
pub enum FinderError {
    /// The stack could not start or continue a scan.
    #[error("BLE scan failed: {0}")]
    ScanFailed(String),
}

impl From<BleError> for FinderError {
    fn from(e: BleError) -> Self {
        FinderError::ScanFailed(e.to_string())
    }
}

/// Finds the peripheral named `target_name`.
pub struct DeviceFinder {
    central: Arc<dyn BleCentral>,
    target_name: String,
    scan_window: Duration,
    matched: bool,
    scans_started: u32,
}

impl DeviceFinder {
    pub fn new(
        central: Arc<dyn BleCentral>,
        target_name: impl Into<String>,
        scan_window: Duration,
    ) -> Self {
        Self {
            central,
            target_name: target_name.into(),
            scan_window,
            matched: false,
            scans_started: 0,
        }
    }

    /// Issues the first scan.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ScanFailed`] if the scan request is rejected.
    pub async fn start(&mut self) -> Result<(), FinderError> {
        info!("scanning for {:?}", self.target_name);
        self.scan().await
    }

    /// Feeds one BLE notification to the finder.
    ///
    /// Returns `Ok(Some(record))` exactly once, for the first peripheral whose
    /// name matches. All other notifications return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ScanFailed`] if the stack reports a scan failure
    /// or a rescan cannot be issued. Both are fatal to the sender.
    pub async fn handle_event(
        &mut self,
        event: &BleEvent,
    ) -> Result<Option<PeripheralRecord>, FinderError> {
        if self.matched {
            return Ok(None);
        }

        match event {
            BleEvent::DeviceDiscovered(record) if record.name == self.target_name => {
                self.matched = true;
                info!("found {:?} ({})", record.name, record.id);
                if let Err(e) = self.central.stop_scan().await {
                    warn!("failed to stop scan after match: {e}");
                }
                Ok(Some(record.clone()))
            }
            BleEvent::DeviceDiscovered(record) => {
                debug!("ignoring {:?} ({})", record.name, record.id);
                Ok(None)
            }
            BleEvent::ScanFinished => {
                info!(
                    "no peripheral named {:?} found within {:?}, scanning again",
                    self.target_name, self.scan_window
                );
                self.scan().await?;
                Ok(None)
            }
            BleEvent::ScanFailed(message) => Err(FinderError::ScanFailed(message.clone())),
            _ => Ok(None),
        }
    }

    /// Returns `true` once the target has been found.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Number of scans issued so far.
    pub fn scans_started(&self) -> u32 {
        self.scans_started
    }

    async fn scan(&mut self) -> Result<(), FinderError> {
        self.scans_started += 1;
        debug!("starting scan #{}", self.scans_started);
        self.central.start_scan(self.scan_window).await?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
