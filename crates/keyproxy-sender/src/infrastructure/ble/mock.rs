//! Scriptable in-memory BLE central for tests.
//!
//! # Why a mock central?
//!
//! The real adapter needs a Bluetooth radio, a powered-on peripheral and
//! seconds of wall-clock time per connection. `MockCentral` replaces all of
//! that with a small state machine whose outcomes the test decides up front:
//!
//! - each `start_scan` consumes the next [`ScanOutcome`] from a script;
//! - `connect` either succeeds at once, is held until the test calls
//!   [`MockCentral::accept_connection`], or is refused a set number of times;
//! - disconnects and connection errors can be injected at any point.
//!
//! Every request is recorded with a timestamp from the tokio clock, so tests
//! running with paused time can assert on exact timing.
//!
//! # Usage in tests
//!
//! ```ignore
//! let (central, events) = MockCentral::new();
//! central.script_scans([ScanOutcome::found(PeripheralRecord::new("dev-1", "Flipper"))]);
//! let central = Arc::new(central);
//! // ... run the sender with `central` and `events` ...
//! assert_eq!(central.payloads()[0], vec![0x01, 0x04, 0x00]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use super::{
    BleCentral, BleError, BleEvent, CharacteristicHandle, LinkState, PeripheralId,
    PeripheralRecord,
};

/// Service UUID every mock peripheral exposes unless told otherwise.
pub const MOCK_SERVICE_UUID: Uuid = Uuid::from_u128(0x8fe5b3d5_2e7f_4a98_2a48_7acc60fe0000);

/// Characteristic UUID of the default mock service.
pub const MOCK_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x19ed82ae_ed21_4c9d_4145_228e62fe0000);

/// What happens when the sender starts a scan.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The listed peripherals are discovered immediately, in order.
    Found(Vec<PeripheralRecord>),
    /// Nothing is found; `ScanFinished` is emitted when the window elapses.
    Timeout,
    /// The stack reports a scan failure.
    Fail(String),
}

impl ScanOutcome {
    pub fn found(record: PeripheralRecord) -> Self {
        ScanOutcome::Found(vec![record])
    }
}

/// One recorded characteristic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub id: PeripheralId,
    pub characteristic: CharacteristicHandle,
    pub data: Vec<u8>,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct MockService {
    uuid: Uuid,
    characteristics: Vec<CharacteristicHandle>,
}

#[derive(Debug, Default)]
struct MockState {
    scan_script: VecDeque<ScanOutcome>,
    start_scan_error: Option<String>,
    scan_starts: Vec<Instant>,
    scan_stops: usize,
    hold_connections: bool,
    refusals_left: usize,
    fail_writes: bool,
    links: HashMap<PeripheralId, LinkState>,
    services: HashMap<PeripheralId, Vec<MockService>>,
    connects: Vec<(PeripheralId, Instant)>,
    writes: Vec<WriteRecord>,
}

/// A BLE central that records requests and answers them from a script.
#[derive(Debug)]
pub struct MockCentral {
    events: mpsc::UnboundedSender<BleEvent>,
    state: Mutex<MockState>,
    /// Bumped by every start/stop so a stale window timer stays silent.
    scan_generation: Arc<AtomicU64>,
}

impl MockCentral {
    /// Creates a mock central and the receiver its notifications arrive on.
    ///
    /// With an empty script, every scan times out.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: tx,
                state: Mutex::new(MockState::default()),
                scan_generation: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    // ── Scripting ─────────────────────────────────────────────────────────────

    /// Appends outcomes for the next scans, consumed one per `start_scan`.
    pub fn script_scans(&self, outcomes: impl IntoIterator<Item = ScanOutcome>) {
        self.state.lock().unwrap().scan_script.extend(outcomes);
    }

    /// Makes every subsequent `start_scan` request return an error.
    pub fn fail_start_scan(&self, message: &str) {
        self.state.lock().unwrap().start_scan_error = Some(message.to_string());
    }

    /// When `true`, `connect` leaves the peripheral in `Connecting` until
    /// [`MockCentral::accept_connection`] is called.
    pub fn hold_connections(&self, hold: bool) {
        self.state.lock().unwrap().hold_connections = hold;
    }

    /// Refuses the next `count` connection attempts with
    /// `ConnectionError` followed by `Disconnected`.
    pub fn refuse_connections(&self, count: usize) {
        self.state.lock().unwrap().refusals_left = count;
    }

    /// When `true`, every write returns [`BleError::Write`] and is not recorded.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Replaces the GATT profile of `id` with one service per entry, in
    /// discovery order.
    pub fn set_services(&self, id: &PeripheralId, services: &[(Uuid, Vec<Uuid>)]) {
        let profile = services
            .iter()
            .map(|(service, chars)| MockService {
                uuid: *service,
                characteristics: chars
                    .iter()
                    .map(|uuid| CharacteristicHandle {
                        service: *service,
                        uuid: *uuid,
                    })
                    .collect(),
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .services
            .insert(id.clone(), profile);
    }

    /// Overrides the link state reported for `id`.
    pub fn set_link_state(&self, id: &PeripheralId, state: LinkState) {
        self.state.lock().unwrap().links.insert(id.clone(), state);
    }

    // ── Injection ─────────────────────────────────────────────────────────────

    /// Completes a held connection attempt.
    pub fn accept_connection(&self, id: &PeripheralId) {
        self.set_link_state(id, LinkState::Connected);
        self.emit(BleEvent::Connected(id.clone()));
    }

    /// Drops the link to `id` as if the peripheral went out of range.
    pub fn inject_disconnect(&self, id: &PeripheralId) {
        self.set_link_state(id, LinkState::Unconnected);
        self.emit(BleEvent::Disconnected(id.clone()));
    }

    /// Reports a connection error without changing the link state.
    pub fn inject_connection_error(&self, id: &PeripheralId, message: &str) {
        self.emit(BleEvent::ConnectionError {
            id: id.clone(),
            message: message.to_string(),
        });
    }

    /// Delivers an arbitrary notification.
    pub fn emit(&self, event: BleEvent) {
        // The receiver is gone once the sender loop has stopped; nothing to do.
        let _ = self.events.send(event);
    }

    // ── Observation ───────────────────────────────────────────────────────────

    /// Number of scans started so far.
    pub fn scan_starts(&self) -> usize {
        self.state.lock().unwrap().scan_starts.len()
    }

    /// Instants at which scans were started.
    pub fn scan_start_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().scan_starts.clone()
    }

    /// Number of `stop_scan` requests.
    pub fn scan_stops(&self) -> usize {
        self.state.lock().unwrap().scan_stops
    }

    /// Peripherals passed to `connect`, in order.
    pub fn connects(&self) -> Vec<PeripheralId> {
        self.state
            .lock()
            .unwrap()
            .connects
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Payloads of every successful write, in order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|w| w.data.clone())
            .collect()
    }

    fn default_profile() -> Vec<MockService> {
        vec![MockService {
            uuid: MOCK_SERVICE_UUID,
            characteristics: vec![CharacteristicHandle {
                service: MOCK_SERVICE_UUID,
                uuid: MOCK_CHARACTERISTIC_UUID,
            }],
        }]
    }

    fn spawn_scan_timer(&self, window: Duration) {
        let generation = Arc::clone(&self.scan_generation);
        let started = generation.load(Ordering::SeqCst);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) == started {
                let _ = events.send(BleEvent::ScanFinished);
            }
        });
    }
}

#[async_trait]
impl BleCentral for MockCentral {
    async fn start_scan(&self, window: Duration) -> Result<(), BleError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = &state.start_scan_error {
                return Err(BleError::Scan(message.clone()));
            }
            state.scan_starts.push(Instant::now());
            state.scan_script.pop_front().unwrap_or(ScanOutcome::Timeout)
        };
        self.scan_generation.fetch_add(1, Ordering::SeqCst);

        match outcome {
            ScanOutcome::Found(records) => {
                for record in records {
                    self.emit(BleEvent::DeviceDiscovered(record));
                }
                self.spawn_scan_timer(window);
            }
            ScanOutcome::Timeout => self.spawn_scan_timer(window),
            ScanOutcome::Fail(message) => self.emit(BleEvent::ScanFailed(message)),
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.scan_generation.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().scan_stops += 1;
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<(), BleError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.connects.push((id.clone(), Instant::now()));
            if state.refusals_left > 0 {
                state.refusals_left -= 1;
                state.links.insert(id.clone(), LinkState::Unconnected);
                Some(false)
            } else if state.hold_connections {
                state.links.insert(id.clone(), LinkState::Connecting);
                None
            } else {
                state.links.insert(id.clone(), LinkState::Connected);
                Some(true)
            }
        };

        match outcome {
            Some(true) => self.emit(BleEvent::Connected(id.clone())),
            Some(false) => {
                self.emit(BleEvent::ConnectionError {
                    id: id.clone(),
                    message: "connection refused".to_string(),
                });
                self.emit(BleEvent::Disconnected(id.clone()));
            }
            None => {}
        }
        Ok(())
    }

    async fn discover_services(&self, id: &PeripheralId) -> Result<(), BleError> {
        let services = {
            let mut state = self.state.lock().unwrap();
            state.links.insert(id.clone(), LinkState::Discovering);
            state
                .services
                .get(id)
                .cloned()
                .unwrap_or_else(Self::default_profile)
        };
        for service in services {
            self.emit(BleEvent::ServiceDiscovered {
                id: id.clone(),
                service: service.uuid,
            });
        }
        Ok(())
    }

    async fn discover_characteristics(
        &self,
        id: &PeripheralId,
        _service: Uuid,
    ) -> Result<(), BleError> {
        self.set_link_state(id, LinkState::Discovered);
        Ok(())
    }

    fn link_state(&self, id: &PeripheralId) -> LinkState {
        self.state
            .lock()
            .unwrap()
            .links
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    fn characteristics(&self, id: &PeripheralId, service: Uuid) -> Vec<CharacteristicHandle> {
        let state = self.state.lock().unwrap();
        let profile = state
            .services
            .get(id)
            .cloned()
            .unwrap_or_else(Self::default_profile);
        profile
            .into_iter()
            .find(|s| s.uuid == service)
            .map(|s| s.characteristics)
            .unwrap_or_default()
    }

    async fn write_without_response(
        &self,
        id: &PeripheralId,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), BleError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(BleError::Write("mock failure".into()));
        }
        state.writes.push(WriteRecord {
            id: id.clone(),
            characteristic: *characteristic,
            data: data.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }
}
