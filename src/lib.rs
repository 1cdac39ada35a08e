//! # ble-service-probe
//!
//! A one-shot diagnostic probe for a Bluetooth Low Energy peripheral's
//! standard GATT services.
//!
//! A run connects to one peripheral, waits (bounded) for its Service Changed
//! indication, lists every discovered service and characteristic, then
//! probes Generic Access, Device Information, Battery and Current Time and
//! reports whether a vendor service is present.
//!
//! ## Features
//!
//! - **Reconnect on demand**: every operation first makes sure the link is up
//! - **Resilient reads**: bounded retries with stabilization and retry delays
//! - **Readiness gate**: set-once latch fed by Service Changed indications
//! - **Independent probes**: a failing probe never stops its siblings
//! - **Watchdog**: the run executes in a worker process with a hard timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ble_service_probe::{BtleplugTransport, DeviceTester, ProbeConfig, Report, Result, UuidCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let catalog = UuidCatalog::standard();
//!     let transport = BtleplugTransport::new(catalog).await?;
//!
//!     let mut tester = DeviceTester::new(
//!         Arc::new(transport),
//!         ProbeConfig::for_address("18:7E:B9:6A:B8:5D"),
//!         catalog,
//!         Report::stdout(),
//!     );
//!
//!     let summary = tester.run_all_tests().await;
//!     if let Some(level) = summary.battery {
//!         println!("Battery: {}", level);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Peripheral addresses are hidden; pass the
//! platform identifier instead.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod probes;
pub mod report;
pub mod tester;
pub mod watchdog;

// Re-exports for convenience
pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use report::Report;
pub use tester::{DeviceTester, TestPhase, TestSummary};
pub use watchdog::{Watchdog, WatchdogConfig, WatchdogOutcome};

// Re-export commonly used types from submodules
pub use ble::connection::{ConnectionManager, ConnectionState};
pub use ble::platform::BtleplugTransport;
pub use ble::readiness::{ReadinessOutcome, ReadinessSignal};
pub use ble::transport::{BleTransport, GattConnection, ServiceCatalog};
pub use ble::uuids::UuidCatalog;
pub use data::{Appearance, BatteryLevel, CurrentTime, LocalTimeInfo};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        let _ = std::any::TypeId::of::<DeviceTester>();
        let _ = std::any::TypeId::of::<ConnectionManager>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<BatteryLevel>();
        let _ = std::any::TypeId::of::<CurrentTime>();
        let _ = std::any::TypeId::of::<WatchdogOutcome>();
    }
}
