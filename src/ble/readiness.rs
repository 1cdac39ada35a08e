//! Service readiness handshake.
//!
//! After connecting, a peripheral may still be rebuilding its GATT table.
//! If it exposes the Service Changed characteristic we subscribe to it and
//! wait, bounded, for the first indication before discovery runs.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::transport::{GattConnection, NotificationCallback};
use crate::ble::uuids::{GattName, UuidCatalog};
use crate::report::Report;

/// Single-shot latch set by the Service Changed callback.
///
/// The first [`ReadinessSignal::set`] flips the latch; later calls are
/// no-ops. Waiters unblock on the first set, and waiting on an already-set
/// latch returns immediately. The latch is never reset.
#[derive(Debug, Clone)]
pub struct ReadinessSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadinessSignal {
    /// Create an unset latch.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the latch. Returns `true` only for the call that set it.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Whether the latch has been set.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the latch is set or `timeout` elapses.
    ///
    /// Returns `true` if the latch is set.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() {
            return true;
        }

        let ready = match tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => true,
            // The sender lives in `self`, so the channel cannot close here.
            Ok(Err(_)) => self.is_set(),
            Err(_) => false,
        };
        ready
    }
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// How the readiness wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// The Service Changed indication arrived.
    Ready,
    /// Nothing arrived in time; services are assumed ready.
    TimedOut,
    /// The Generic Attribute service is not exposed.
    ServiceUnavailable,
    /// Service Changed is missing or cannot be subscribed to.
    CharacteristicUnavailable,
    /// Looking up or subscribing failed; the run continues regardless.
    Failed,
}

impl ReadinessOutcome {
    /// Whether a subscription was made that cleanup should cancel.
    pub fn subscribed(&self) -> bool {
        matches!(self, Self::Ready | Self::TimedOut)
    }
}

/// Best-effort wait for the peripheral's services to settle.
pub struct ServiceReadinessGate<'a> {
    catalog: &'a UuidCatalog,
    signal: &'a ReadinessSignal,
}

impl<'a> ServiceReadinessGate<'a> {
    /// Default bound on the wait.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(catalog: &'a UuidCatalog, signal: &'a ReadinessSignal) -> Self {
        Self { catalog, signal }
    }

    /// Subscribe to Service Changed and wait for it, at most `timeout`.
    ///
    /// Never fails: every outcome lets the run proceed.
    pub async fn wait_for_services(
        &self,
        connection: &dyn GattConnection,
        timeout: Duration,
        report: &mut Report,
    ) -> ReadinessOutcome {
        let outcome = self.subscribe_and_wait(connection, timeout).await;

        match outcome {
            ReadinessOutcome::Ready => report.line("Services ready"),
            ReadinessOutcome::TimedOut => {
                report.line("Timed out waiting for services, continuing (they may already be available)")
            }
            ReadinessOutcome::ServiceUnavailable => {
                report.line("Generic Attribute service unavailable, continuing")
            }
            ReadinessOutcome::CharacteristicUnavailable => {
                report.line("Service Changed characteristic unavailable, continuing")
            }
            ReadinessOutcome::Failed => report.line("Error while waiting for services, continuing"),
        }

        outcome
    }

    async fn subscribe_and_wait(
        &self,
        connection: &dyn GattConnection,
        timeout: Duration,
    ) -> ReadinessOutcome {
        let service_uuid = self.catalog.uuid(GattName::GenericAttribute);
        let changed_uuid = self.catalog.uuid(GattName::ServiceChanged);

        let services = match connection.list_services().await {
            Ok(services) => services,
            Err(e) => {
                warn!("Error while waiting for services: {}", e);
                return ReadinessOutcome::Failed;
            }
        };

        let Some(service) = services.iter().find(|s| s.uuid == service_uuid) else {
            debug!("No Generic Attribute service");
            return ReadinessOutcome::ServiceUnavailable;
        };

        let notifiable = service
            .characteristic(&changed_uuid)
            .map(|c| c.supports_notify())
            .unwrap_or(false);
        if !notifiable {
            debug!("Service Changed missing or not notifiable");
            return ReadinessOutcome::CharacteristicUnavailable;
        }

        let signal = self.signal.clone();
        let callback: NotificationCallback = Box::new(move |_uuid: Uuid, _value: Vec<u8>| {
            if signal.set() {
                info!("Received Service Changed notification");
            }
        });

        if let Err(e) = connection.start_notify(&changed_uuid, callback).await {
            warn!("Error while waiting for services: {}", e);
            return ReadinessOutcome::Failed;
        }

        info!("Waiting up to {:?} for services to become available", timeout);
        if self.signal.wait(timeout).await {
            ReadinessOutcome::Ready
        } else {
            ReadinessOutcome::TimedOut
        }
    }
}
