//! Feature probes, one per standard service.
//!
//! Every probe is independent: it ensures the connection, looks up its
//! service in the discovered catalog, reads what it needs through the
//! [`ResilientReader`] and reports the decoded values. Errors never leave a
//! probe; they are logged and the probe returns `None`.

pub mod battery;
pub mod current_time;
pub mod device_information;
pub mod generic_access;

pub use battery::BatteryProbe;
pub use current_time::{CurrentTimeProbe, CurrentTimeReport};
pub use device_information::{DeviceInformationProbe, DeviceInformationReport};
pub use generic_access::{GenericAccessProbe, GenericAccessReport};

use tracing::warn;

use crate::ble::characteristics::{CharacteristicDescriptor, ReadValue, ResilientReader};
use crate::ble::connection::ConnectionManager;
use crate::ble::transport::{ServiceCatalog, ServiceDescriptor};
use crate::ble::uuids::{GattName, UuidCatalog};
use crate::error::{Error, Result};
use crate::report::Report;

/// Everything a probe needs for one run.
pub struct ProbeContext<'a> {
    /// The run's connection.
    pub connection: &'a mut ConnectionManager,
    /// Services discovered after the readiness wait.
    pub services: &'a ServiceCatalog,
    /// UUID table.
    pub catalog: &'a UuidCatalog,
    /// Retrying reader.
    pub reader: ResilientReader,
    /// Maximum characters shown for string values.
    pub display_width: usize,
    /// Output sink.
    pub report: &'a mut Report,
}

impl ProbeContext<'_> {
    /// Ensure the connection and find `service` in the catalog.
    async fn require_service(&mut self, service: GattName) -> Result<ServiceDescriptor> {
        if !self.connection.ensure_connection().await {
            return Err(Error::NotConnected);
        }

        let uuid = self.catalog.uuid(service);
        self.services
            .get(&uuid)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: uuid.to_string(),
            })
    }

    /// Read through the retrying reader.
    async fn read(&mut self, descriptor: CharacteristicDescriptor) -> Option<ReadValue> {
        self.reader
            .read_with_retry(self.connection, &descriptor)
            .await
    }

    /// Report the outcome of a probe, turning errors into a log line.
    fn finish<T>(&mut self, service_label: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(Error::NotConnected) => {
                self.report.line("Not connected to device");
                None
            }
            Err(Error::ServiceNotFound { .. }) => {
                self.report
                    .line(format!("Device does not support {}", service_label));
                None
            }
            Err(e) => {
                warn!("{} probe failed: {}", service_label, e);
                self.report
                    .line(format!("Error while testing {}: {}", service_label, e));
                None
            }
        }
    }
}
