//! BLE central capability used by the sender.
//!
//! The application layer never talks to a Bluetooth stack directly. It issues
//! requests through the [`BleCentral`] trait and learns their outcomes from
//! [`BleEvent`]s delivered on a channel that each adapter creates alongside
//! itself.
//!
//! # Request / notification model (for beginners)
//!
//! Bluetooth operations are slow and can fail long after they were requested
//! (a connection attempt may sit for seconds before timing out). The trait
//! therefore splits every operation in two:
//!
//! 1. The *request* (`connect`, `discover_services`, ...) returns as soon as
//!    the stack has accepted it. An `Err` means the request could not even be
//!    issued.
//! 2. The *outcome* arrives later as a [`BleEvent`] (`Connected`,
//!    `ConnectionError`, `ServiceDiscovered`, ...).
//!
//! Two facts are not delivered as events and are polled instead:
//! [`BleCentral::link_state`] and [`BleCentral::characteristics`]. The
//! connector polls them on every transmit tick to decide whether the link is
//! usable.
//!
//! # Adapters
//!
//! - **`btleplug_central`** – Real adapter backed by the first system
//!   Bluetooth adapter.
//! - **`mock`** – Scriptable in-memory adapter for tests.

pub mod btleplug_central;
pub mod mock;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier of a remote peripheral, stable for one adapter session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeripheralId(pub String);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralRecord {
    pub id: PeripheralId,
    /// Advertised local name. Peripherals without a name are never reported.
    pub name: String,
}

impl PeripheralRecord {
    pub fn new(id: impl Into<PeripheralId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Handle to a GATT characteristic that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle {
    /// UUID of the service the characteristic belongs to.
    pub service: Uuid,
    /// UUID of the characteristic itself.
    pub uuid: Uuid,
}

/// Link state of one peripheral as reported by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Unconnected,
    Connecting,
    Connected,
    Discovering,
    /// Services and characteristics are known and writes may be issued.
    Discovered,
}

/// Asynchronous outcome of a [`BleCentral`] request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleEvent {
    DeviceDiscovered(PeripheralRecord),
    /// The scan window elapsed without `stop_scan`.
    ScanFinished,
    ScanFailed(String),
    Connected(PeripheralId),
    Disconnected(PeripheralId),
    ConnectionError { id: PeripheralId, message: String },
    ServiceDiscovered { id: PeripheralId, service: Uuid },
}

/// Errors returned when a request cannot be issued.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BleError {
    #[error("no Bluetooth adapter available")]
    NoAdapter,

    #[error("Bluetooth adapter error: {0}")]
    Adapter(String),

    #[error("scan request failed: {0}")]
    Scan(String),

    #[error("no peripheral selected")]
    NoDevice,

    #[error("unknown peripheral {0}")]
    UnknownPeripheral(PeripheralId),

    #[error("characteristic {0} not found")]
    UnknownCharacteristic(Uuid),

    #[error("write failed: {0}")]
    Write(String),
}

/// Requests a BLE central can issue.
///
/// Implementations must be cheap to call from the sender loop: long-running
/// work (connecting, discovery) is started here and completed in the
/// background, with the result reported as a [`BleEvent`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BleCentral: Send + Sync {
    /// Starts a low-energy scan bounded by `window`.
    ///
    /// Emits [`BleEvent::DeviceDiscovered`] for each named peripheral and
    /// [`BleEvent::ScanFinished`] when the window elapses.
    async fn start_scan(&self, window: Duration) -> Result<(), BleError>;

    /// Stops the running scan. No `ScanFinished` follows.
    async fn stop_scan(&self) -> Result<(), BleError>;

    /// Starts connecting. Emits `Connected`, or `ConnectionError` followed by
    /// `Disconnected`.
    async fn connect(&self, id: &PeripheralId) -> Result<(), BleError>;

    /// Starts service discovery. Emits one `ServiceDiscovered` per service.
    async fn discover_services(&self, id: &PeripheralId) -> Result<(), BleError>;

    /// Starts characteristic discovery for `service`.
    async fn discover_characteristics(
        &self,
        id: &PeripheralId,
        service: Uuid,
    ) -> Result<(), BleError>;

    /// Current link state of `id`.
    fn link_state(&self, id: &PeripheralId) -> LinkState;

    /// Characteristics known for `service` on `id`, in discovery order.
    fn characteristics(&self, id: &PeripheralId, service: Uuid) -> Vec<CharacteristicHandle>;

    /// Writes `data` to `characteristic` without requesting a response.
    async fn write_without_response(
        &self,
        id: &PeripheralId,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), BleError>;
}
