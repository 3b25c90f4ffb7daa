//! EventSender: the transmit and keepalive duties.
//!
//! Both duties run off timers owned by the sender loop and both start by
//! polling [`DeviceConnector::readiness`]. When the link is not ready they do
//! nothing at all: the queue keeps growing and no frame is written.
//!
//! - **Transmit** takes at most one event per tick, so the queue drains at a
//!   bounded rate and never bursts after a reconnect.
//! - **Keepalive** writes three zero bytes and never touches the queue.
//!
//! An item that cannot be decoded permanently switches transmit off. The
//! keepalive keeps running, so the peripheral stays connected but receives no
//! more key events until the sender is restarted.

use keyproxy_core::protocol::{encode_key_event, KEEPALIVE_PAYLOAD};
use keyproxy_core::{EventQueueConsumer, QueueError};
use tracing::{debug, error, trace};

use super::connect_device::DeviceConnector;

/// Counters for diagnostics and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SenderStats {
    pub events_sent: u64,
    pub keepalives_sent: u64,
    pub write_failures: u64,
}

/// Drains the event queue into the characteristic.
pub struct EventSender {
    queue: EventQueueConsumer,
    transmit_enabled: bool,
    stats: SenderStats,
}

impl EventSender {
    pub fn new(queue: EventQueueConsumer) -> Self {
        Self {
            queue,
            transmit_enabled: true,
            stats: SenderStats::default(),
        }
    }

    /// `false` once a malformed item has been seen.
    pub fn transmit_enabled(&self) -> bool {
        self.transmit_enabled
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// Number of events still waiting in the queue.
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }

    /// Sends at most one queued event.
    ///
    /// The event is removed from the queue only when the link is ready. If the
    /// write request then fails, the event is lost.
    pub async fn transmit_tick(&mut self, connector: &mut DeviceConnector) {
        if !self.transmit_enabled {
            return;
        }
        let Some(characteristic) = connector.readiness() else {
            return;
        };

        let event = match self.queue.try_pop() {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(QueueError::Closed) => {
                trace!("event queue closed and drained");
                return;
            }
            Err(e) => {
                error!("{e}; transmission disabled");
                self.transmit_enabled = false;
                return;
            }
        };

        let frame = encode_key_event(&event);
        match connector.write(&characteristic, &frame).await {
            Ok(()) => {
                self.stats.events_sent += 1;
                debug!("sent {event} ({} queued)", self.queue.len());
            }
            Err(e) => {
                self.stats.write_failures += 1;
                error!("failed to send {event}: {e}");
            }
        }
    }

    /// Writes the keepalive frame if the link is ready.
    pub async fn keepalive_tick(&mut self, connector: &mut DeviceConnector) {
        let Some(characteristic) = connector.readiness() else {
            return;
        };
        match connector.write(&characteristic, &KEEPALIVE_PAYLOAD).await {
            Ok(()) => {
                self.stats.keepalives_sent += 1;
                trace!("keepalive sent");
            }
            Err(e) => {
                self.stats.write_failures += 1;
                error!("failed to send keepalive: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
