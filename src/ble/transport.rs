//! The BLE transport capability consumed by the probe.
//!
//! Scanning, GATT encoding and radio-level connection setup live behind
//! [`BleTransport`] and [`GattConnection`]. The production implementation is
//! [`crate::ble::platform::BtleplugTransport`]; tests drive the same seam
//! with a scripted transport.

use async_trait::async_trait;
use btleplug::api::CharPropFlags;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;

/// Callback invoked with the characteristic UUID and payload of a notification.
pub type NotificationCallback = Box<dyn Fn(Uuid, Vec<u8>) + Send + Sync>;

/// A discovered characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Human-readable description.
    pub description: String,
    /// GATT properties advertised by the peripheral.
    pub properties: CharPropFlags,
}

impl CharacteristicInfo {
    /// Whether the characteristic can be subscribed to.
    pub fn supports_notify(&self) -> bool {
        self.properties
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
    }

    /// Labels for the properties shown during discovery.
    pub fn property_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.properties.contains(CharPropFlags::READ) {
            labels.push("read");
        }
        if self.properties.contains(CharPropFlags::WRITE) {
            labels.push("write");
        }
        if self
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            labels.push("write-without-response");
        }
        if self.properties.contains(CharPropFlags::NOTIFY) {
            labels.push("notify");
        }
        labels
    }
}

/// A discovered service with its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service UUID.
    pub uuid: Uuid,
    /// Human-readable description.
    pub description: String,
    /// Characteristics in discovery order.
    pub characteristics: Vec<CharacteristicInfo>,
}

impl ServiceDescriptor {
    /// Look up a characteristic of this service.
    pub fn characteristic(&self, uuid: &Uuid) -> Option<&CharacteristicInfo> {
        self.characteristics.iter().find(|c| c.uuid == *uuid)
    }

    /// Whether this service exposes the characteristic.
    pub fn has_characteristic(&self, uuid: &Uuid) -> bool {
        self.characteristic(uuid).is_some()
    }
}

/// Snapshot of the services discovered on the peripheral.
///
/// Populated once after the readiness wait; read-only for the rest of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    services: Vec<ServiceDescriptor>,
}

impl ServiceCatalog {
    /// Build a catalog from a discovery result.
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }

    /// Look up a service by UUID.
    pub fn get(&self, uuid: &Uuid) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.uuid == *uuid)
    }

    /// Whether a service with this UUID was discovered.
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.get(uuid).is_some()
    }

    /// Membership test on the textual form, ignoring case.
    pub fn contains_str(&self, uuid: &str) -> bool {
        let needle = uuid.trim().to_ascii_lowercase();
        self.services
            .iter()
            .any(|s| s.uuid.hyphenated().to_string() == needle)
    }

    /// Services in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    /// Number of discovered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether nothing was discovered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// A live link to one peripheral.
#[async_trait]
pub trait GattConnection: Send + Sync {
    /// Whether the link still reports itself connected.
    async fn is_connected(&self) -> bool;

    /// Tear down the link.
    async fn disconnect(&self) -> Result<()>;

    /// Read a characteristic value.
    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>>;

    /// Services and characteristics known on this link.
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>>;

    /// Subscribe to a characteristic, delivering each value to `callback`.
    async fn start_notify(&self, uuid: &Uuid, callback: NotificationCallback) -> Result<()>;

    /// Stop a subscription made with [`GattConnection::start_notify`].
    async fn stop_notify(&self, uuid: &Uuid) -> Result<()>;
}

/// Factory for connections to a peripheral identified by address.
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Open a connection, giving up after `timeout`.
    async fn connect(&self, address: &str, timeout: Duration) -> Result<Arc<dyn GattConnection>>;
}
