//! `btleplug` implementation of the transport.
//!
//! Finds the target peripheral by scanning for its address, connects and
//! discovers services within the caller's timeout, and exposes reads and
//! notifications over the discovered characteristics.

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::ble::transport::{
    BleTransport, CharacteristicInfo, GattConnection, NotificationCallback, ServiceDescriptor,
};
use crate::ble::uuids::UuidCatalog;
use crate::error::{Error, Result};

/// How often the adapter's peripheral list is checked while scanning.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Transport backed by the first Bluetooth adapter on the system.
pub struct BtleplugTransport {
    /// The BLE adapter used for scanning and connecting.
    adapter: Adapter,
    /// Names for discovered attributes.
    catalog: UuidCatalog,
}

impl BtleplugTransport {
    /// Open the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new(catalog: UuidCatalog) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter, catalog))
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter, catalog: UuidCatalog) -> Self {
        Self { adapter, catalog }
    }

    /// Scan until a peripheral matching `target` shows up.
    ///
    /// Runs until a match is found; callers bound it with a timeout.
    async fn find_peripheral(&self, target: &PeripheralTarget) -> Result<Peripheral> {
        debug!("Scanning for {}", target);
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        loop {
            for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
                let id = format!("{:?}", peripheral.id());
                if target.matches(peripheral.address(), &id) {
                    debug!("Found peripheral {}", id);
                    self.stop_scan().await;
                    return Ok(peripheral);
                }
            }

            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    async fn stop_scan(&self) {
        if let Err(e) = self.adapter.stop_scan().await {
            trace!("Failed to stop scan: {}", e);
        }
    }
}

/// How the configured address selects a peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PeripheralTarget {
    /// A hardware address.
    Address(BDAddr),
    /// A platform peripheral id (macOS hides hardware addresses).
    Id(String),
}

impl PeripheralTarget {
    fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidData {
                context: "device address is empty".to_string(),
            });
        }

        Ok(match address.parse::<BDAddr>() {
            Ok(addr) => Self::Address(addr),
            Err(_) => Self::Id(address.to_ascii_lowercase()),
        })
    }

    fn matches(&self, address: BDAddr, id: &str) -> bool {
        match self {
            Self::Address(target) => *target == address,
            Self::Id(needle) => id.to_ascii_lowercase().contains(needle.as_str()),
        }
    }
}

impl std::fmt::Display for PeripheralTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{}", addr),
            Self::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Stage of a connect attempt, for mapping an expired timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectStage {
    /// Looking for the advertisement.
    Scan,
    /// Connecting to and discovering a peripheral that was found.
    Establish,
}

impl ConnectStage {
    fn elapsed_error(self, address: &str, limit: Duration) -> Error {
        match self {
            Self::Scan => Error::DeviceNotFound {
                address: address.to_string(),
            },
            Self::Establish => Error::Timeout {
                operation: format!("connect to {} within {:?}", address, limit),
            },
        }
    }
}

/// Run `attempt` for at most `limit`, mapping expiry by `stage`.
async fn bounded<T, F>(stage: ConnectStage, address: &str, limit: Duration, attempt: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(stage.elapsed_error(address, limit)),
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    async fn connect(&self, address: &str, timeout: Duration) -> Result<Arc<dyn GattConnection>> {
        let target = PeripheralTarget::parse(address)?;
        let deadline = Instant::now() + timeout;

        let found = bounded(ConnectStage::Scan, address, timeout, self.find_peripheral(&target)).await;
        let peripheral = match found {
            Ok(peripheral) => peripheral,
            Err(e) => {
                self.stop_scan().await;
                return Err(e);
            }
        };

        let establish = async {
            peripheral
                .connect()
                .await
                .map_err(|e| Error::ConnectionFailed {
                    reason: e.to_string(),
                })?;
            peripheral
                .discover_services()
                .await
                .map_err(Error::Bluetooth)
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(e) = bounded(ConnectStage::Establish, address, remaining, establish).await {
            if let Err(disconnect_error) = peripheral.disconnect().await {
                trace!("Disconnect after failed connect: {}", disconnect_error);
            }
            return Err(e);
        }

        info!("Connected to {}", address);
        Ok(Arc::new(BtleplugConnection::new(peripheral, self.catalog)))
    }
}

/// A connected `btleplug` peripheral.
pub struct BtleplugConnection {
    /// The connected peripheral.
    peripheral: Peripheral,
    /// Names for discovered attributes.
    catalog: UuidCatalog,
    /// Notification listener tasks by characteristic UUID.
    listeners: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl BtleplugConnection {
    fn new(peripheral: Peripheral, catalog: UuidCatalog) -> Self {
        Self {
            peripheral,
            catalog,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    fn characteristic(&self, uuid: &Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == *uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })
    }

    fn abort_listeners(&self) {
        for (uuid, handle) in self.listeners.lock().drain() {
            trace!("Stopping notification listener for {}", uuid);
            handle.abort();
        }
    }
}

#[async_trait]
impl GattConnection for BtleplugConnection {
    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<()> {
        self.abort_listeners();
        self.peripheral.disconnect().await.map_err(Error::Bluetooth)?;
        debug!("Disconnected from peripheral");
        Ok(())
    }

    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(uuid)?;

        let data = self
            .peripheral
            .read(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Read {} bytes from characteristic {}", data.len(), uuid);

        Ok(data)
    }

    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>> {
        let services = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| ServiceDescriptor {
                uuid: service.uuid,
                description: self.catalog.describe(&service.uuid).to_string(),
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| CharacteristicInfo {
                        uuid: c.uuid,
                        description: self.catalog.describe(&c.uuid).to_string(),
                        properties: c.properties,
                    })
                    .collect(),
            })
            .collect();

        Ok(services)
    }

    async fn start_notify(&self, uuid: &Uuid, callback: NotificationCallback) -> Result<()> {
        let characteristic = self.characteristic(uuid)?;

        // The stream must exist before subscribing: a value sent as soon as
        // the subscription is enabled is dropped otherwise.
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(Error::Bluetooth)?;

        self.peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| {
                debug!("Failed to subscribe to {}: {:?}", uuid, e);
                Error::Bluetooth(e)
            })?;

        let handle = spawn_listener(notifications, *uuid, callback);
        if let Some(previous) = self.listeners.lock().insert(*uuid, handle) {
            previous.abort();
        }

        debug!("Subscribed to notifications from {}", uuid);
        Ok(())
    }

    async fn stop_notify(&self, uuid: &Uuid) -> Result<()> {
        if let Some(handle) = self.listeners.lock().remove(uuid) {
            handle.abort();
        }

        let characteristic = self.characteristic(uuid)?;
        self.peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        debug!("Unsubscribed from notifications from {}", uuid);
        Ok(())
    }
}

/// Forward notifications for `target` from `notifications` to `callback`.
fn spawn_listener<S>(mut notifications: S, target: Uuid, callback: NotificationCallback) -> JoinHandle<()>
where
    S: Stream<Item = ValueNotification> + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            if notification.uuid == target {
                trace!(
                    "Notification from {}: {} bytes",
                    notification.uuid,
                    notification.value.len()
                );
                callback(notification.uuid, notification.value);
            }
        }
        debug!("Notification stream for {} ended", target);
    })
}

impl Drop for BtleplugConnection {
    fn drop(&mut self) {
        self.abort_listeners();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "18:7E:B9:6A:B8:5D";

    #[test]
    fn test_target_parses_hardware_address() {
        let target = PeripheralTarget::parse(ADDRESS).unwrap();
        let addr: BDAddr = ADDRESS.parse().unwrap();

        assert_eq!(target, PeripheralTarget::Address(addr));
        assert!(target.matches(addr, "PeripheralId(hci0/dev_18_7E_B9_6A_B8_5D)"));
        assert!(!target.matches(BDAddr::default(), "PeripheralId(18:7e:b9:6a:b8:5d)"));
    }

    #[test]
    fn test_target_falls_back_to_platform_id() {
        let target = PeripheralTarget::parse("  6F1C2A3B-0000-4000-8000-00AABBCCDDEE ").unwrap();

        assert!(target.matches(
            BDAddr::default(),
            "PeripheralId(6f1c2a3b-0000-4000-8000-00aabbccddee)"
        ));
        assert!(!target.matches(BDAddr::default(), "PeripheralId(00000000-0000-0000-0000-000000000000)"));
    }

    #[test]
    fn test_empty_address_is_rejected() {
        assert!(matches!(
            PeripheralTarget::parse(""),
            Err(Error::InvalidData { .. })
        ));
        assert!(matches!(
            PeripheralTarget::parse("   "),
            Err(Error::InvalidData { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_expiry_is_device_not_found() {
        let result: Result<()> = bounded(
            ConnectStage::Scan,
            ADDRESS,
            Duration::from_secs(6),
            std::future::pending(),
        )
        .await;

        match result {
            Err(Error::DeviceNotFound { address }) => assert_eq!(address, ADDRESS),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_connect_is_timeout() {
        let result: Result<()> = bounded(
            ConnectStage::Establish,
            ADDRESS,
            Duration::from_secs(2),
            std::future::pending(),
        )
        .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_passes_results_through() {
        let ok = bounded(ConnectStage::Scan, ADDRESS, Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let failed: Result<()> = bounded(ConnectStage::Establish, ADDRESS, Duration::from_secs(1), async {
            Err(Error::ConnectionFailed {
                reason: "refused".to_string(),
            })
        })
        .await;
        assert!(matches!(failed, Err(Error::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_listener_delivers_values_queued_before_it_starts() {
        let target = crate::ble::uuids::SERVICE_CHANGED_UUID;
        let other = crate::ble::uuids::BATTERY_LEVEL_UUID;
        // Queued on the stream before the listener task runs.
        let queued = futures::stream::iter(vec![
            ValueNotification {
                uuid: target,
                value: vec![0x01, 0x00, 0xFF, 0xFF],
            },
            ValueNotification {
                uuid: other,
                value: vec![42],
            },
            ValueNotification {
                uuid: target,
                value: vec![0x02],
            },
        ]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: NotificationCallback = Box::new(move |uuid: Uuid, value: Vec<u8>| {
            sink.lock().push((uuid, value));
        });

        spawn_listener(queued, target, callback).await.unwrap();

        assert_eq!(
            *seen.lock(),
            vec![(target, vec![0x01, 0x00, 0xFF, 0xFF]), (target, vec![0x02])]
        );
    }
}
