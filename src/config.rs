//! Run configuration.

use std::time::Duration;
use uuid::Uuid;

use crate::ble::characteristics::RetryPolicy;
use crate::ble::connection::ConnectionManager;
use crate::ble::readiness::ServiceReadinessGate;
use crate::ble::uuids::ANCS_SERVICE_UUID;
use crate::data::DISPLAY_WIDTH;
use crate::watchdog::WatchdogConfig;

/// Address probed when none is given.
pub const DEFAULT_DEVICE_ADDRESS: &str = "18:7E:B9:6A:B8:5D";

/// Settings for one diagnostic run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Address of the target peripheral.
    pub address: String,
    /// Timeout for the primary connection.
    pub connect_timeout: Duration,
    /// Timeout for on-demand reconnects.
    pub reconnect_timeout: Duration,
    /// Bound on the Service Changed wait.
    pub readiness_timeout: Duration,
    /// Retry budget and delays for characteristic reads.
    pub retry: RetryPolicy,
    /// Vendor service whose presence is reported.
    pub vendor_service: Uuid,
    /// Maximum characters shown for string values.
    pub display_width: usize,
    /// Supervisor limits.
    pub watchdog: WatchdogConfig,
}

impl ProbeConfig {
    /// Default timeout for the primary connection.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(6);

    /// Default configuration for `address`.
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            reconnect_timeout: ConnectionManager::DEFAULT_RECONNECT_TIMEOUT,
            readiness_timeout: ServiceReadinessGate::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            vendor_service: ANCS_SERVICE_UUID,
            display_width: DISPLAY_WIDTH,
            watchdog: WatchdogConfig::default(),
        }
    }
}
