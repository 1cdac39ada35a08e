//! Generic Access payloads.

/// Decoded Appearance characteristic (0x2A01).
///
/// The upper ten bits select a category, the lower six a sub-category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Appearance(pub u16);

impl Appearance {
    /// Decode a little-endian appearance value.
    ///
    /// Shorter payloads are zero-extended; bytes beyond the second are ignored.
    pub fn from_bytes(data: &[u8]) -> Self {
        let low = data.first().copied().unwrap_or(0);
        let high = data.get(1).copied().unwrap_or(0);
        Self(u16::from_le_bytes([low, high]))
    }

    /// Raw appearance value.
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Category number (value >> 6).
    pub fn category(&self) -> u16 {
        self.0 >> 6
    }

    /// Sub-category number (low 6 bits).
    pub fn sub_category(&self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    /// Name of the category, for the common ones.
    pub fn category_name(&self) -> &'static str {
        match self.category() {
            0x000 => "Unknown",
            0x001 => "Phone",
            0x002 => "Computer",
            0x003 => "Watch",
            0x004 => "Clock",
            0x005 => "Display",
            0x006 => "Remote Control",
            0x007 => "Eye-glasses",
            0x008 => "Tag",
            0x009 => "Keyring",
            0x00A => "Media Player",
            0x00B => "Barcode Scanner",
            0x00C => "Thermometer",
            0x00D => "Heart Rate Sensor",
            0x00E => "Blood Pressure",
            0x00F => "Human Interface Device",
            0x010 => "Glucose Meter",
            0x011 => "Running Walking Sensor",
            0x012 => "Cycling",
            0x031 => "Pulse Oximeter",
            0x032 => "Weight Scale",
            0x033 => "Personal Mobility Device",
            0x034 => "Continuous Glucose Monitor",
            0x035 => "Insulin Pump",
            0x036 => "Medication Delivery",
            0x051 => "Outdoor Sports Activity",
            _ => "Other",
        }
    }
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.category_name())
    }
}
