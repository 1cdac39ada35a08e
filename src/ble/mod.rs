//! BLE communication module.
//!
//! This module provides the transport seam, the connection manager, the
//! retrying characteristic reader and the service readiness gate.

pub mod characteristics;
pub mod connection;
pub mod platform;
pub mod readiness;
pub mod transport;
pub mod uuids;

#[cfg(test)]
pub mod mock;

pub use characteristics::{CharacteristicDescriptor, ReadValue, ResilientReader, RetryPolicy};
pub use connection::{ConnectionManager, ConnectionState};
pub use platform::{BtleplugConnection, BtleplugTransport};
pub use readiness::{ReadinessOutcome, ReadinessSignal, ServiceReadinessGate};
pub use transport::{
    BleTransport, CharacteristicInfo, GattConnection, NotificationCallback, ServiceCatalog,
    ServiceDescriptor,
};
pub use uuids::*;
