//! [`BleCentral`] backed by `btleplug` and the first system Bluetooth adapter.
//!
//! `btleplug` exposes a pull-style API (`connect().await`,
//! `discover_services().await`) plus a stream of [`CentralEvent`]s. This
//! adapter turns both into the request / notification model of
//! [`BleCentral`]:
//!
//! - long operations run on spawned tasks and report through the event channel;
//! - the adapter's own event stream is pumped on a background task and
//!   filtered down to named peripherals and disconnects;
//! - link state is tracked per peripheral so the connector can poll it.
//!
//! `btleplug` reports each peripheral once per adapter session. Every
//! `start_scan` therefore re-announces the peripherals the adapter already
//! knows, so a rescan after a timeout can still find a device that was seen
//! before it got its name.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId as BtPeripheralId};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{
    BleCentral, BleError, BleEvent, CharacteristicHandle, LinkState, PeripheralId,
    PeripheralRecord,
};

type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

fn adapter_err(e: btleplug::Error) -> BleError {
    BleError::Adapter(e.to_string())
}

/// Locks `mutex`, ignoring poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_peripheral_id(id: &BtPeripheralId) -> PeripheralId {
    PeripheralId(id.to_string())
}

struct Tracked {
    peripheral: Peripheral,
    link: LinkState,
}

struct Inner {
    // Dropping the manager tears down the D-Bus session on Linux.
    _manager: Manager,
    adapter: Adapter,
    events: mpsc::UnboundedSender<BleEvent>,
    peripherals: Mutex<HashMap<PeripheralId, Tracked>>,
    announced: Mutex<HashSet<PeripheralId>>,
    scanning: AtomicBool,
    scan_generation: AtomicU64,
}

impl Inner {
    fn emit(&self, event: BleEvent) {
        let _ = self.events.send(event);
    }

    /// Sets the link state of `id` and returns the previous one.
    fn set_link(&self, id: &PeripheralId, link: LinkState) -> LinkState {
        let mut peripherals = lock(&self.peripherals);
        match peripherals.get_mut(id) {
            Some(tracked) => std::mem::replace(&mut tracked.link, link),
            None => LinkState::Unconnected,
        }
    }

    fn peripheral(&self, id: &PeripheralId) -> Result<Peripheral, BleError> {
        lock(&self.peripherals)
            .get(id)
            .map(|t| t.peripheral.clone())
            .ok_or_else(|| BleError::UnknownPeripheral(id.clone()))
    }

    /// Reports `bt_id` as discovered if it has a name and has not been
    /// reported during the current scan.
    async fn announce(&self, bt_id: &BtPeripheralId) {
        let peripheral = match self.adapter.peripheral(bt_id).await {
            Ok(p) => p,
            Err(e) => {
                debug!("peripheral {bt_id} vanished before it could be inspected: {e}");
                return;
            }
        };
        let name = match peripheral.properties().await {
            Ok(Some(props)) => props.local_name,
            Ok(None) => None,
            Err(e) => {
                debug!("could not read properties of {bt_id}: {e}");
                None
            }
        };
        let Some(name) = name else {
            return;
        };

        let id = to_peripheral_id(bt_id);
        if !lock(&self.announced).insert(id.clone()) {
            return;
        }
        lock(&self.peripherals)
            .entry(id.clone())
            .or_insert(Tracked {
                peripheral,
                link: LinkState::Unconnected,
            });

        trace!("discovered {name:?} ({id})");
        self.emit(BleEvent::DeviceDiscovered(PeripheralRecord { id, name }));
    }

    fn find_characteristic(
        &self,
        peripheral: &Peripheral,
        handle: &CharacteristicHandle,
    ) -> Result<Characteristic, BleError> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == handle.uuid && c.service_uuid == handle.service)
            .ok_or(BleError::UnknownCharacteristic(handle.uuid))
    }
}

/// Forwards the adapter's event stream into [`BleEvent`]s.
async fn pump_events(inner: Arc<Inner>, mut stream: EventStream) {
    while let Some(event) = stream.next().await {
        match event {
            CentralEvent::DeviceDiscovered(bt_id) | CentralEvent::DeviceUpdated(bt_id) => {
                if inner.scanning.load(Ordering::Acquire) {
                    inner.announce(&bt_id).await;
                }
            }
            CentralEvent::DeviceDisconnected(bt_id) => {
                let id = to_peripheral_id(&bt_id);
                if inner.set_link(&id, LinkState::Unconnected) != LinkState::Unconnected {
                    inner.emit(BleEvent::Disconnected(id));
                }
            }
            _ => {}
        }
    }
    warn!("Bluetooth adapter event stream ended");
}

/// The production [`BleCentral`].
pub struct BtleplugCentral {
    inner: Arc<Inner>,
}

impl BtleplugCentral {
    /// Opens the first Bluetooth adapter and starts pumping its events.
    ///
    /// Returns the central and the receiver its notifications arrive on.
    ///
    /// # Errors
    ///
    /// - [`BleError::NoAdapter`] if the system has no Bluetooth adapter.
    /// - [`BleError::Adapter`] if the Bluetooth stack cannot be reached.
    pub async fn new() -> Result<(Self, mpsc::UnboundedReceiver<BleEvent>), BleError> {
        let manager = Manager::new().await.map_err(adapter_err)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(adapter_err)?
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter)?;
        match adapter.adapter_info().await {
            Ok(info) => info!("using Bluetooth adapter {info}"),
            Err(e) => debug!("adapter info unavailable: {e}"),
        }
        let stream = adapter.events().await.map_err(adapter_err)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            _manager: manager,
            adapter,
            events: tx,
            peripherals: Mutex::new(HashMap::new()),
            announced: Mutex::new(HashSet::new()),
            scanning: AtomicBool::new(false),
            scan_generation: AtomicU64::new(0),
        });
        tokio::spawn(pump_events(Arc::clone(&inner), stream));

        Ok((Self { inner }, rx))
    }
}

#[async_trait]
impl BleCentral for BtleplugCentral {
    async fn start_scan(&self, window: Duration) -> Result<(), BleError> {
        let generation = self.inner.scan_generation.fetch_add(1, Ordering::AcqRel) + 1;
        lock(&self.inner.announced).clear();

        self.inner
            .adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?;
        self.inner.scanning.store(true, Ordering::Release);

        match self.inner.adapter.peripherals().await {
            Ok(known) => {
                for peripheral in known {
                    self.inner.announce(&peripheral.id()).await;
                }
            }
            Err(e) => warn!("could not list known peripherals: {e}"),
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if inner.scan_generation.load(Ordering::Acquire) != generation {
                return;
            }
            inner.scanning.store(false, Ordering::Release);
            if let Err(e) = inner.adapter.stop_scan().await {
                warn!("failed to stop scan after window elapsed: {e}");
            }
            inner.emit(BleEvent::ScanFinished);
        });
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.inner.scan_generation.fetch_add(1, Ordering::AcqRel);
        self.inner.scanning.store(false, Ordering::Release);
        self.inner
            .adapter
            .stop_scan()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))
    }

    async fn connect(&self, id: &PeripheralId) -> Result<(), BleError> {
        let peripheral = self.inner.peripheral(id)?;
        self.inner.set_link(id, LinkState::Connecting);

        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        tokio::spawn(async move {
            match peripheral.connect().await {
                Ok(()) => {
                    inner.set_link(&id, LinkState::Connected);
                    inner.emit(BleEvent::Connected(id));
                }
                Err(e) => {
                    inner.set_link(&id, LinkState::Unconnected);
                    inner.emit(BleEvent::ConnectionError {
                        id: id.clone(),
                        message: e.to_string(),
                    });
                    inner.emit(BleEvent::Disconnected(id));
                }
            }
        });
        Ok(())
    }

    async fn discover_services(&self, id: &PeripheralId) -> Result<(), BleError> {
        let peripheral = self.inner.peripheral(id)?;
        self.inner.set_link(id, LinkState::Discovering);

        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        tokio::spawn(async move {
            match peripheral.discover_services().await {
                Ok(()) => {
                    inner.set_link(&id, LinkState::Discovered);
                    for service in peripheral.services() {
                        inner.emit(BleEvent::ServiceDiscovered {
                            id: id.clone(),
                            service: service.uuid,
                        });
                    }
                }
                Err(e) => {
                    inner.emit(BleEvent::ConnectionError {
                        id: id.clone(),
                        message: format!("service discovery failed: {e}"),
                    });
                    // Without services the link is useless; drop it so the
                    // connector starts over.
                    if let Err(e) = peripheral.disconnect().await {
                        debug!("disconnect after failed discovery: {e}");
                    }
                    if inner.set_link(&id, LinkState::Unconnected) != LinkState::Unconnected {
                        inner.emit(BleEvent::Disconnected(id));
                    }
                }
            }
        });
        Ok(())
    }

    async fn discover_characteristics(
        &self,
        id: &PeripheralId,
        service: Uuid,
    ) -> Result<(), BleError> {
        // btleplug resolves characteristics together with services.
        self.inner.peripheral(id)?;
        trace!("characteristics of {service} on {id} already resolved");
        Ok(())
    }

    fn link_state(&self, id: &PeripheralId) -> LinkState {
        lock(&self.inner.peripherals)
            .get(id)
            .map(|t| t.link)
            .unwrap_or_default()
    }

    fn characteristics(&self, id: &PeripheralId, service: Uuid) -> Vec<CharacteristicHandle> {
        let Ok(peripheral) = self.inner.peripheral(id) else {
            return Vec::new();
        };
        peripheral
            .characteristics()
            .into_iter()
            .filter(|c| c.service_uuid == service)
            .map(|c| CharacteristicHandle {
                service: c.service_uuid,
                uuid: c.uuid,
            })
            .collect()
    }

    async fn write_without_response(
        &self,
        id: &PeripheralId,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), BleError> {
        let peripheral = self.inner.peripheral(id)?;
        let target = self.inner.find_characteristic(&peripheral, characteristic)?;
        peripheral
            .write(&target, data, WriteType::WithoutResponse)
            .await
            .map_err(|e| BleError::Write(e.to_string()))
    }
}
