//! DeviceConnector: the connection state machine.
//!
//! Once the finder hands over a [`PeripheralRecord`], the connector owns the
//! link to that peripheral for the rest of the sender's life:
//!
//! ```text
//! Idle ──device_found──▶ Connecting ──Connected──▶ Connected
//!                            ▲                         │ ServiceDiscovered
//!                            │                         ▼
//!                      Disconnected ◀──Disconnected── DiscoveringServices
//!                                                      │ readiness() succeeds
//!                                                      ▼
//!                                                    Ready
//! ```
//!
//! Any state with a known device moves to `Disconnected` on a disconnect
//! notification and straight back to `Connecting`. There is no backoff. The
//! record from the first match is reused for every reconnect.
//!
//! Readiness is not pushed. [`DeviceConnector::readiness`] is polled on every
//! transmit and keepalive tick and is the only place that decides whether a
//! write may be issued.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::infrastructure::ble::{
    BleCentral, BleError, BleEvent, CharacteristicHandle, LinkState, PeripheralId,
    PeripheralRecord,
};

/// Where the connector is in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device has been handed over yet.
    Idle,
    Connecting,
    Connected,
    /// A service was reported and its characteristics are being resolved.
    DiscoveringServices { service: Uuid },
    /// Writes go to `characteristic`.
    Ready {
        service: Uuid,
        characteristic: CharacteristicHandle,
    },
    /// Transient: immediately followed by `Connecting`.
    Disconnected,
}

/// Drives the link to one peripheral.
pub struct DeviceConnector {
    central: Arc<dyn BleCentral>,
    device: Option<PeripheralRecord>,
    state: ConnectionState,
    reconnects: u32,
}

impl DeviceConnector {
    pub fn new(central: Arc<dyn BleCentral>) -> Self {
        Self {
            central,
            device: None,
            state: ConnectionState::Idle,
            reconnects: 0,
        }
    }

    /// Current state, for logging and tests.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The peripheral handed over by the finder, if any.
    pub fn device(&self) -> Option<&PeripheralRecord> {
        self.device.as_ref()
    }

    /// Number of reconnect attempts made after a link loss.
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    /// Takes ownership of the found peripheral and starts connecting.
    ///
    /// Only the first call has an effect; the device slot is assigned once.
    pub async fn device_found(&mut self, record: PeripheralRecord) {
        if self.state != ConnectionState::Idle {
            warn!("ignoring second device hand-off for {}", record.id);
            return;
        }
        info!("connecting to {:?} ({})", record.name, record.id);
        let id = record.id.clone();
        self.device = Some(record);
        self.connect(&id).await;
    }

    /// Feeds one BLE notification to the state machine.
    ///
    /// Notifications about other peripherals are ignored.
    pub async fn handle_event(&mut self, event: &BleEvent) {
        let Some(id) = self.device.as_ref().map(|d| d.id.clone()) else {
            return;
        };

        match event {
            BleEvent::Connected(peer) if *peer == id => {
                if self.state != ConnectionState::Connecting {
                    debug!("unexpected Connected for {id} in state {:?}", self.state);
                    return;
                }
                info!("connected to {id}, discovering services");
                self.state = ConnectionState::Connected;
                if let Err(e) = self.central.discover_services(&id).await {
                    error!("service discovery request for {id} failed: {e}");
                }
            }

            BleEvent::ServiceDiscovered { id: peer, service } if *peer == id => {
                match self.state {
                    ConnectionState::Connected
                    | ConnectionState::DiscoveringServices { .. }
                    | ConnectionState::Ready { .. } => {}
                    other => {
                        debug!("ignoring service {service} in state {other:?}");
                        return;
                    }
                }
                // The last service reported wins.
                debug!("service {service} discovered on {id}");
                self.state = ConnectionState::DiscoveringServices { service: *service };
                if let Err(e) = self.central.discover_characteristics(&id, *service).await {
                    error!("characteristic discovery request for {id} failed: {e}");
                }
            }

            BleEvent::Disconnected(peer) if *peer == id => {
                info!("lost link to {id}, reconnecting");
                self.state = ConnectionState::Disconnected;
                self.reconnects += 1;
                self.connect(&id).await;
            }

            BleEvent::ConnectionError { id: peer, message } if *peer == id => {
                error!("connection error on {id}: {message}");
            }

            _ => {}
        }
    }

    /// Returns the characteristic to write to, or `None` if the link is not
    /// usable right now.
    ///
    /// The link is usable when a service has been chosen, the stack reports
    /// the peripheral as fully discovered, and that service has at least one
    /// characteristic. The first characteristic is used. The first successful
    /// poll moves the state to [`ConnectionState::Ready`].
    pub fn readiness(&mut self) -> Option<CharacteristicHandle> {
        let service = match self.state {
            ConnectionState::DiscoveringServices { service }
            | ConnectionState::Ready { service, .. } => service,
            _ => return None,
        };
        let id = &self.device.as_ref()?.id;

        if self.central.link_state(id) != LinkState::Discovered {
            return None;
        }
        let characteristic = self.central.characteristics(id, service).first().copied()?;

        if let ConnectionState::DiscoveringServices { .. } = self.state {
            info!("link to {id} ready, writing to characteristic {}", characteristic.uuid);
            self.state = ConnectionState::Ready {
                service,
                characteristic,
            };
        }
        Some(characteristic)
    }

    /// Writes `data` to `characteristic` on the connected peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NoDevice`] if no device has been handed over, or
    /// whatever the central reports for the write request.
    pub async fn write(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), BleError> {
        let device = self.device.as_ref().ok_or(BleError::NoDevice)?;
        self.central
            .write_without_response(&device.id, characteristic, data)
            .await
    }

    async fn connect(&mut self, id: &PeripheralId) {
        self.state = ConnectionState::Connecting;
        if let Err(e) = self.central.connect(id).await {
            error!("connect request for {id} failed: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ble::mock::{
        MockCentral, MOCK_CHARACTERISTIC_UUID, MOCK_SERVICE_UUID,
    };

    const DEVICE: &str = "dev-1";

    fn setup() -> (Arc<MockCentral>, DeviceConnector) {
        let (central, _rx) = MockCentral::new();
        let central = Arc::new(central);
        let connector = DeviceConnector::new(Arc::clone(&central) as Arc<dyn BleCentral>);
        (central, connector)
    }

    fn id() -> PeripheralId {
        PeripheralId::from(DEVICE)
    }

    async fn drive_to_discovering(central: &MockCentral, connector: &mut DeviceConnector) {
        central.hold_connections(true);
        connector
            .device_found(PeripheralRecord::new(DEVICE, "Flipper"))
            .await;
        central.set_link_state(&id(), LinkState::Connected);
        connector.handle_event(&BleEvent::Connected(id())).await;
        connector
            .handle_event(&BleEvent::ServiceDiscovered {
                id: id(),
                service: MOCK_SERVICE_UUID,
            })
            .await;
    }

    #[tokio::test]
    async fn test_new_connector_is_idle_and_not_ready() {
        let (_central, mut connector) = setup();

        assert_eq!(connector.state(), ConnectionState::Idle);
        assert_eq!(connector.readiness(), None);
    }

    #[tokio::test]
    async fn test_device_found_starts_connecting() {
        let (central, mut connector) = setup();

        connector
            .device_found(PeripheralRecord::new(DEVICE, "Flipper"))
            .await;

        assert_eq!(connector.state(), ConnectionState::Connecting);
        assert_eq!(central.connects(), vec![id()]);
    }

    #[tokio::test]
    async fn test_device_slot_is_assigned_once() {
        let (central, mut connector) = setup();
        connector
            .device_found(PeripheralRecord::new(DEVICE, "Flipper"))
            .await;

        connector
            .device_found(PeripheralRecord::new("dev-2", "Flipper"))
            .await;

        assert_eq!(connector.device().map(|d| d.id.clone()), Some(id()));
        assert_eq!(central.connects().len(), 1);
    }

    #[tokio::test]
    async fn test_connected_moves_to_connected() {
        let (central, mut connector) = setup();
        central.hold_connections(true);
        connector
            .device_found(PeripheralRecord::new(DEVICE, "Flipper"))
            .await;

        connector.handle_event(&BleEvent::Connected(id())).await;

        assert_eq!(connector.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_service_discovered_moves_to_discovering() {
        let (central, mut connector) = setup();

        drive_to_discovering(&central, &mut connector).await;

        assert_eq!(
            connector.state(),
            ConnectionState::DiscoveringServices {
                service: MOCK_SERVICE_UUID
            }
        );
    }

    #[tokio::test]
    async fn test_last_reported_service_wins() {
        // Arrange
        let (central, mut connector) = setup();
        let later = Uuid::from_u128(0x1234);
        drive_to_discovering(&central, &mut connector).await;

        // Act
        connector
            .handle_event(&BleEvent::ServiceDiscovered {
                id: id(),
                service: later,
            })
            .await;

        // Assert
        assert_eq!(
            connector.state(),
            ConnectionState::DiscoveringServices { service: later }
        );
    }

    #[tokio::test]
    async fn test_readiness_requires_discovered_link_state() {
        // Arrange
        let (central, mut connector) = setup();
        drive_to_discovering(&central, &mut connector).await;
        central.set_link_state(&id(), LinkState::Discovering);

        // Act / Assert
        assert_eq!(connector.readiness(), None);
        assert!(matches!(
            connector.state(),
            ConnectionState::DiscoveringServices { .. }
        ));
    }

    #[tokio::test]
    async fn test_readiness_requires_a_characteristic() {
        // Arrange
        let (central, mut connector) = setup();
        central.set_services(&id(), &[(MOCK_SERVICE_UUID, vec![])]);
        drive_to_discovering(&central, &mut connector).await;
        central.set_link_state(&id(), LinkState::Discovered);

        // Act / Assert
        assert_eq!(connector.readiness(), None);
    }

    #[tokio::test]
    async fn test_first_successful_poll_promotes_to_ready() {
        // Arrange
        let (central, mut connector) = setup();
        drive_to_discovering(&central, &mut connector).await;
        central.set_link_state(&id(), LinkState::Discovered);
        let expected = CharacteristicHandle {
            service: MOCK_SERVICE_UUID,
            uuid: MOCK_CHARACTERISTIC_UUID,
        };

        // Act
        let ready = connector.readiness();

        // Assert
        assert_eq!(ready, Some(expected));
        assert_eq!(
            connector.state(),
            ConnectionState::Ready {
                service: MOCK_SERVICE_UUID,
                characteristic: expected
            }
        );
    }

    #[tokio::test]
    async fn test_first_characteristic_is_taken_without_filtering() {
        // Arrange
        let (central, mut connector) = setup();
        let first = Uuid::from_u128(0xAAAA);
        let second = Uuid::from_u128(0xBBBB);
        central.set_services(&id(), &[(MOCK_SERVICE_UUID, vec![first, second])]);
        drive_to_discovering(&central, &mut connector).await;
        central.set_link_state(&id(), LinkState::Discovered);

        // Act
        let ready = connector.readiness();

        // Assert
        assert_eq!(ready.map(|c| c.uuid), Some(first));
    }

    #[tokio::test]
    async fn test_disconnect_reconnects_immediately_with_same_record() {
        // Arrange
        let (central, mut connector) = setup();
        drive_to_discovering(&central, &mut connector).await;

        // Act
        connector.handle_event(&BleEvent::Disconnected(id())).await;

        // Assert
        assert_eq!(connector.state(), ConnectionState::Connecting);
        assert_eq!(central.connects(), vec![id(), id()]);
        assert_eq!(connector.reconnects(), 1);
        assert_eq!(connector.readiness(), None);
    }

    #[tokio::test]
    async fn test_connection_error_causes_no_transition() {
        let (central, mut connector) = setup();
        drive_to_discovering(&central, &mut connector).await;
        let before = connector.state();

        connector
            .handle_event(&BleEvent::ConnectionError {
                id: id(),
                message: "timeout".into(),
            })
            .await;

        assert_eq!(connector.state(), before);
    }

    #[tokio::test]
    async fn test_events_for_other_peripherals_are_ignored() {
        let (central, mut connector) = setup();
        central.hold_connections(true);
        connector
            .device_found(PeripheralRecord::new(DEVICE, "Flipper"))
            .await;

        connector
            .handle_event(&BleEvent::Connected("someone-else".into()))
            .await;
        connector
            .handle_event(&BleEvent::Disconnected("someone-else".into()))
            .await;

        assert_eq!(connector.state(), ConnectionState::Connecting);
        assert_eq!(central.connects().len(), 1);
    }

    #[tokio::test]
    async fn test_events_before_device_found_are_ignored() {
        let (central, mut connector) = setup();

        connector.handle_event(&BleEvent::Disconnected(id())).await;

        assert_eq!(connector.state(), ConnectionState::Idle);
        assert!(central.connects().is_empty());
    }

    #[tokio::test]
    async fn test_write_goes_to_handed_over_device() {
        // Arrange
        let (central, mut connector) = setup();
        drive_to_discovering(&central, &mut connector).await;
        central.set_link_state(&id(), LinkState::Discovered);
        let characteristic = connector.readiness().unwrap();

        // Act
        connector.write(&characteristic, &[1, 4, 0]).await.unwrap();

        // Assert
        let writes = central.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].id, id());
        assert_eq!(writes[0].data, vec![1, 4, 0]);
    }
}
