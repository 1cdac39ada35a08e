//! Current Time Service payloads.
//!
//! Decodes the Current Time (0x2A2B) and Local Time Information (0x2A0F)
//! characteristics.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Day of week as encoded by the Current Time characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DayOfWeek {
    /// Not known (raw 0).
    #[default]
    Unknown,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Create from raw value. Reserved values map to `Unknown`.
    pub fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            7 => Self::Sunday,
            _ => Self::Unknown,
        }
    }

    /// Get a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

/// Decoded Current Time characteristic.
///
/// The first seven bytes (little-endian year, month, day, hours, minutes,
/// seconds) are required; day of week, fractions and adjust reason are
/// decoded when the peripheral sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurrentTime {
    /// Year, 0 when unknown.
    pub year: u16,
    /// Month 1-12, 0 when unknown.
    pub month: u8,
    /// Day 1-31, 0 when unknown.
    pub day: u8,
    /// Hours 0-23.
    pub hours: u8,
    /// Minutes 0-59.
    pub minutes: u8,
    /// Seconds 0-59.
    pub seconds: u8,
    /// Day of week.
    pub day_of_week: DayOfWeek,
    /// Fractions of a second in 1/256 units.
    pub fractions256: u8,
    /// Adjust reason bit field.
    pub adjust_reason: u8,
}

impl CurrentTime {
    /// Minimum payload length (the Date Time field).
    pub const MIN_SIZE: usize = 7;

    /// Parse the characteristic payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::InvalidData {
                context: format!(
                    "Current Time needs {} bytes, got {}",
                    Self::MIN_SIZE,
                    data.len()
                ),
            });
        }

        Ok(Self {
            year: u16::from_le_bytes([data[0], data[1]]),
            month: data[2],
            day: data[3],
            hours: data[4],
            minutes: data[5],
            seconds: data[6],
            day_of_week: DayOfWeek::from_raw(data.get(7).copied().unwrap_or(0)),
            fractions256: data.get(8).copied().unwrap_or(0),
            adjust_reason: data.get(9).copied().unwrap_or(0),
        })
    }

    /// Convert to a calendar date-time, if every field is valid.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hours as u32,
            self.minutes as u32,
            self.seconds as u32,
        )
    }

    /// Names of the adjust-reason flags that are set.
    pub fn adjust_reasons(&self) -> Vec<&'static str> {
        const FLAGS: [(u8, &str); 4] = [
            (0x01, "manual time update"),
            (0x02, "external reference time update"),
            (0x04, "change of time zone"),
            (0x08, "change of DST"),
        ];

        FLAGS
            .iter()
            .filter(|(bit, _)| self.adjust_reason & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::fmt::Display for CurrentTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hours, self.minutes, self.seconds
        )
    }
}

/// Decoded Local Time Information characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalTimeInfo {
    /// Offset from UTC in 15-minute steps, `None` when unknown (-128).
    pub time_zone_quarters: Option<i8>,
    /// DST offset in 15-minute steps, `None` when unknown (255).
    pub dst_quarters: Option<u8>,
}

impl LocalTimeInfo {
    /// Payload size in bytes.
    pub const SIZE: usize = 2;

    /// Parse the characteristic payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::InvalidData {
                context: format!("Local Time Information needs 2 bytes, got {}", data.len()),
            });
        }

        let zone = data[0] as i8;
        Ok(Self {
            time_zone_quarters: (zone != i8::MIN).then_some(zone),
            dst_quarters: (data[1] != u8::MAX).then_some(data[1]),
        })
    }

    /// UTC offset in minutes.
    pub fn utc_offset_minutes(&self) -> Option<i32> {
        self.time_zone_quarters.map(|q| q as i32 * 15)
    }

    /// Human-readable DST state.
    pub fn dst_name(&self) -> &'static str {
        match self.dst_quarters {
            Some(0) => "Standard Time",
            Some(2) => "Half an hour Daylight Time (+0.5h)",
            Some(4) => "Daylight Time (+1h)",
            Some(8) => "Double Daylight Time (+2h)",
            Some(_) => "Reserved",
            None => "Unknown",
        }
    }
}

impl std::fmt::Display for LocalTimeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.utc_offset_minutes() {
            Some(minutes) => {
                let sign = if minutes < 0 { '-' } else { '+' };
                let minutes = minutes.abs();
                write!(
                    f,
                    "UTC{}{:02}:{:02}, {}",
                    sign,
                    minutes / 60,
                    minutes % 60,
                    self.dst_name()
                )
            }
            None => write!(f, "UTC offset unknown, {}", self.dst_name()),
        }
    }
}
