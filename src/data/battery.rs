//! Battery Service payloads.

use crate::error::{Error, Result};

/// Decoded Battery Level characteristic (0x2A19).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryLevel(u8);

impl BatteryLevel {
    /// Highest valid percentage.
    pub const MAX: u8 = 100;

    /// Decode the first byte of the payload as a percentage.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        data.first()
            .copied()
            .map(Self)
            .ok_or_else(|| Error::InvalidData {
                context: "Battery Level payload is empty".to_string(),
            })
    }

    /// The raw percentage byte.
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Whether the value lies in 0-100.
    pub fn is_valid(&self) -> bool {
        self.0 <= Self::MAX
    }
}

impl std::fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}%", self.0)
        } else {
            write!(f, "{} (out of range)", self.0)
        }
    }
}
