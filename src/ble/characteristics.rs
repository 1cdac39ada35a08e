//! GATT characteristic reads.
//!
//! Provides the characteristic descriptors the probes read and the
//! retrying reader that absorbs transient link faults.

use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ble::connection::ConnectionManager;
use crate::error::{Error, Result};

/// A characteristic a probe wants to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// Label used in log and report lines.
    pub label: &'static str,
    /// Decode the payload as UTF-8 text.
    pub decode_as_text: bool,
}

impl CharacteristicDescriptor {
    /// Descriptor for a UTF-8 string characteristic.
    pub const fn text(uuid: Uuid, label: &'static str) -> Self {
        Self {
            uuid,
            label,
            decode_as_text: true,
        }
    }

    /// Descriptor for a binary characteristic.
    pub const fn raw(uuid: Uuid, label: &'static str) -> Self {
        Self {
            uuid,
            label,
            decode_as_text: false,
        }
    }
}

/// A successfully read characteristic value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    /// Payload decoded as UTF-8.
    Text(String),
    /// Raw payload.
    Bytes(Vec<u8>),
}

impl ReadValue {
    /// The value as text, if it was decoded.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }

    /// The value's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// Consume the value, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

/// Attempt budget and delays for [`ResilientReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Pause between a successful `ensure_connection` and the read.
    pub stabilization_delay: Duration,
    /// Pause after a failed read when attempts remain.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            stabilization_delay: Duration::from_millis(500),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Same delays with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Reads characteristics with reconnect-on-demand and bounded retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResilientReader {
    policy: RetryPolicy,
}

impl ResilientReader {
    /// Create a reader with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Read a characteristic, retrying up to the attempt budget.
    ///
    /// Each attempt first ensures the connection; a failed connect uses up
    /// the attempt without a read. The first successful read is returned
    /// immediately. Returns `None` once every attempt has failed.
    pub async fn read_with_retry(
        &self,
        connection: &mut ConnectionManager,
        descriptor: &CharacteristicDescriptor,
    ) -> Option<ReadValue> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            if !connection.ensure_connection().await {
                debug!(
                    "Attempt {}/{} for {}: no connection",
                    attempt, max_attempts, descriptor.label
                );
                continue;
            }

            tokio::time::sleep(self.policy.stabilization_delay).await;

            match self.read_once(connection, descriptor).await {
                Ok(value) => return Some(value),
                Err(e) if attempt < max_attempts => {
                    warn!("Reading {} failed, retrying: {}", descriptor.label, e);
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    warn!("Unable to read {}: {}", descriptor.label, e);
                }
            }
        }

        None
    }

    async fn read_once(
        &self,
        connection: &ConnectionManager,
        descriptor: &CharacteristicDescriptor,
    ) -> Result<ReadValue> {
        let link = connection.connection().ok_or(Error::NotConnected)?;
        let data = link.read_characteristic(&descriptor.uuid).await?;

        if !descriptor.decode_as_text {
            return Ok(ReadValue::Bytes(data));
        }

        String::from_utf8(data)
            .map(ReadValue::Text)
            .map_err(|_| Error::InvalidData {
                context: format!("Invalid UTF-8 in characteristic {}", descriptor.uuid),
            })
    }
}
