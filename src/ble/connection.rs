//! BLE connection management.
//!
//! Owns the single logical connection of a run and re-establishes it on
//! demand before each operation.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ble::transport::{BleTransport, GattConnection};
use crate::error::{Error, Result};

/// Connection state for the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the peripheral.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the peripheral.
    Connected,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Manages the one connection to the target peripheral.
pub struct ConnectionManager {
    /// Transport used to open connections.
    transport: Arc<dyn BleTransport>,
    /// Address of the target peripheral.
    address: String,
    /// Timeout for connections opened by [`ConnectionManager::ensure_connection`].
    reconnect_timeout: Duration,
    /// The live handle, if any.
    connection: Option<Arc<dyn GattConnection>>,
    /// Current connection state.
    state: ConnectionState,
}

impl ConnectionManager {
    /// Default timeout for on-demand reconnects.
    pub const DEFAULT_RECONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a manager for the peripheral at `address`.
    pub fn new(transport: Arc<dyn BleTransport>, address: impl Into<String>) -> Self {
        Self {
            transport,
            address: address.into(),
            reconnect_timeout: Self::DEFAULT_RECONNECT_TIMEOUT,
            connection: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Set the timeout used for on-demand reconnects.
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout = timeout;
        self
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Address of the target peripheral.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The current handle, if one has been opened.
    pub fn connection(&self) -> Option<Arc<dyn GattConnection>> {
        self.connection.clone()
    }

    /// Make sure a live connection exists, reconnecting if needed.
    ///
    /// A stale handle is disconnected (errors ignored) before a fresh one
    /// is opened, so there is never more than one live connection. Connect
    /// failures are logged and reported as `false`.
    pub async fn ensure_connection(&mut self) -> bool {
        if let Some(connection) = &self.connection {
            if connection.is_connected().await {
                return true;
            }
            debug!("Existing connection reports not connected");
        }

        info!("Re-establishing connection to {}", self.address);

        match self.open(self.reconnect_timeout).await {
            Ok(()) => {
                info!("Connected to {}", self.address);
                true
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", self.address, e);
                false
            }
        }
    }

    /// Open the primary connection of a run.
    ///
    /// Unlike [`ConnectionManager::ensure_connection`] this always opens a
    /// fresh link and reports the transport error to the caller.
    pub async fn connect(&mut self, timeout: Duration) -> Result<Arc<dyn GattConnection>> {
        self.open(timeout).await?;
        self.connection.clone().ok_or(Error::NotConnected)
    }

    /// Disconnect and forget the current handle.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };

        self.set_state(ConnectionState::Disconnected);
        connection.disconnect().await
    }

    async fn open(&mut self, timeout: Duration) -> Result<()> {
        self.discard_stale().await;
        self.set_state(ConnectionState::Connecting);

        match self.transport.connect(&self.address, timeout).await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Best-effort disconnect of any handle we still hold.
    async fn discard_stale(&mut self) {
        if let Some(stale) = self.connection.take() {
            if let Err(e) = stale.disconnect().await {
                debug!("Ignoring error while dropping stale connection: {}", e);
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, new_state: ConnectionState) {
        if self.state != new_state {
            debug!("Connection state changed: {} -> {}", self.state, new_state);
            self.state = new_state;
        }
    }
}
