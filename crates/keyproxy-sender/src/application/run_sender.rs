//! The sender loop and the helpers that spawn it.
//!
//! # One task, three inputs (for beginners)
//!
//! Everything the sender does happens on a single tokio task, inside one
//! `tokio::select!` loop that waits on three things at once:
//!
//! 1. **BLE notifications** – scan results and connection changes, fed to the
//!    finder first and then to the connector.
//! 2. **The transmit interval** (default 10 ms) – sends at most one queued
//!    event. This branch is switched off for good once a malformed queue item
//!    has been seen.
//! 3. **The keepalive interval** (fixed 1000 ms) – writes the zero frame.
//!
//! `biased;` makes the select check the branches in that order, so a burst of
//! notifications is always handled before the next write. Both intervals use
//! [`MissedTickBehavior::Skip`]: if the task falls behind, it skips the missed
//! ticks instead of firing them back to back.
//!
//! Because the finder, the connector and the sender all live on this one
//! task, none of their state needs a lock.
//!
//! # Lifetime
//!
//! The loop only returns on a fatal error. The supervisor ends it by aborting
//! the task; the [`LivenessGuard`] owned by the task drops either way and the
//! capture loop sees the sender as dead.

use std::sync::Arc;
use std::time::Duration;

use keyproxy_core::{EventQueueConsumer, LivenessGuard, SenderLiveness};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use super::connect_device::DeviceConnector;
use super::find_device::{DeviceFinder, FinderError, DEFAULT_SCAN_WINDOW};
use super::send_events::EventSender;
use crate::infrastructure::ble::btleplug_central::BtleplugCentral;
use crate::infrastructure::ble::{BleCentral, BleError, BleEvent};

/// Period of the keepalive write.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(1000);

/// Default period of the transmit tick.
pub const DEFAULT_TRANSMIT_INTERVAL: Duration = Duration::from_millis(10);

/// Settings for one sender instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    /// Exact advertised name of the peripheral to connect to.
    pub device_name: String,
    /// Period of the transmit tick. Must be non-zero.
    pub transmit_interval: Duration,
    /// Length of one scan window. Must be non-zero.
    pub scan_window: Duration,
}

impl SenderConfig {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            transmit_interval: DEFAULT_TRANSMIT_INTERVAL,
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }
}

/// Errors that end the sender.
#[derive(Debug, Error)]
pub enum SenderError {
    /// Discovery failed; there is no peripheral to talk to.
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// The Bluetooth stack could not be opened.
    #[error("could not open Bluetooth adapter: {0}")]
    Adapter(#[from] BleError),

    /// The notification channel closed; the adapter is gone.
    #[error("BLE notification channel closed")]
    EventsClosed,
}

/// Runs the sender until a fatal error.
///
/// # Errors
///
/// - [`SenderError::Finder`] if a scan fails.
/// - [`SenderError::EventsClosed`] if `ble_events` closes.
pub async fn run_sender(
    config: SenderConfig,
    central: Arc<dyn BleCentral>,
    mut ble_events: UnboundedReceiver<BleEvent>,
    queue: EventQueueConsumer,
) -> Result<(), SenderError> {
    let mut finder = DeviceFinder::new(
        Arc::clone(&central),
        config.device_name.clone(),
        config.scan_window,
    );
    let mut connector = DeviceConnector::new(central);
    let mut sender = EventSender::new(queue);

    finder.start().await?;

    let mut transmit = time::interval(config.transmit_interval);
    transmit.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut keepalive = time::interval(KEEPALIVE_INTERVAL);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            event = ble_events.recv() => {
                let Some(event) = event else {
                    return Err(SenderError::EventsClosed);
                };
                debug!("BLE event: {event:?}");
                if let Some(record) = finder.handle_event(&event).await? {
                    connector.device_found(record).await;
                }
                connector.handle_event(&event).await;
            }

            _ = transmit.tick(), if sender.transmit_enabled() => {
                sender.transmit_tick(&mut connector).await;
            }

            _ = keepalive.tick() => {
                sender.keepalive_tick(&mut connector).await;
                debug!(
                    "state={:?} queued={} stats={:?}",
                    connector.state(),
                    sender.backlog(),
                    sender.stats()
                );
            }
        }
    }
}

/// Opens the system Bluetooth adapter and runs the sender on a new task.
///
/// Returns the task handle and the liveness flag that turns false when the
/// task ends for any reason, including [`JoinHandle::abort`].
pub fn spawn_sender(
    config: SenderConfig,
    queue: EventQueueConsumer,
) -> (JoinHandle<Result<(), SenderError>>, SenderLiveness) {
    let (liveness, guard) = SenderLiveness::new();
    let handle = tokio::spawn(async move {
        let _guard: LivenessGuard = guard;
        let (central, events) = BtleplugCentral::new().await.inspect_err(|e| {
            error!("sender failed to start: {e}");
        })?;
        supervise_run(config, Arc::new(central), events, queue).await
    });
    (handle, liveness)
}

/// Runs the sender on a new task with the given central.
pub fn spawn_sender_with(
    config: SenderConfig,
    central: Arc<dyn BleCentral>,
    ble_events: UnboundedReceiver<BleEvent>,
    queue: EventQueueConsumer,
) -> (JoinHandle<Result<(), SenderError>>, SenderLiveness) {
    let (liveness, guard) = SenderLiveness::new();
    let handle = tokio::spawn(async move {
        let _guard: LivenessGuard = guard;
        supervise_run(config, central, ble_events, queue).await
    });
    (handle, liveness)
}

async fn supervise_run(
    config: SenderConfig,
    central: Arc<dyn BleCentral>,
    ble_events: UnboundedReceiver<BleEvent>,
    queue: EventQueueConsumer,
) -> Result<(), SenderError> {
    info!(
        "sender started (device {:?}, transmit every {:?})",
        config.device_name, config.transmit_interval
    );
    let result = run_sender(config, central, ble_events, queue).await;
    if let Err(e) = &result {
        error!("sender stopped: {e}");
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use keyproxy_core::event_queue;

    use super::*;
    use crate::infrastructure::ble::mock::{MockCentral, ScanOutcome};

    #[test]
    fn test_sender_config_defaults() {
        let config = SenderConfig::new("Flipper");

        assert_eq!(config.device_name, "Flipper");
        assert_eq!(config.transmit_interval, Duration::from_millis(10));
        assert_eq!(config.scan_window, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_failure_ends_task_and_clears_liveness() {
        // Arrange
        let (central, events) = MockCentral::new();
        central.script_scans([ScanOutcome::Fail("radio off".into())]);
        let (_producer, consumer) = event_queue();

        // Act
        let (handle, liveness) =
            spawn_sender_with(SenderConfig::new("Flipper"), Arc::new(central), events, consumer);
        let result = handle.await.unwrap();

        // Assert
        assert!(matches!(result, Err(SenderError::Finder(_))));
        assert!(!liveness.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_first_scan_is_fatal() {
        let (central, events) = MockCentral::new();
        central.fail_start_scan("busy");
        let (_producer, consumer) = event_queue();

        let result = run_sender(
            SenderConfig::new("Flipper"),
            Arc::new(central),
            events,
            consumer,
        )
        .await;

        assert!(matches!(result, Err(SenderError::Finder(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_clears_liveness() {
        // Arrange
        let (central, events) = MockCentral::new();
        let (_producer, consumer) = event_queue();
        let (handle, liveness) =
            spawn_sender_with(SenderConfig::new("Flipper"), Arc::new(central), events, consumer);
        time::sleep(Duration::from_millis(50)).await;
        assert!(liveness.is_alive());

        // Act
        handle.abort();
        let joined = handle.await;

        // Assert
        assert!(joined.unwrap_err().is_cancelled());
        assert!(!liveness.is_alive());
    }
}
