//! Decoders for standard GATT payloads.
//!
//! This module contains the value types the probes decode: appearance,
//! battery level, current time and local time information.

pub mod appearance;
pub mod battery;
pub mod current_time;
pub mod text;

pub use appearance::Appearance;
pub use battery::BatteryLevel;
pub use current_time::{CurrentTime, DayOfWeek, LocalTimeInfo};
pub use text::{truncate_for_display, DISPLAY_WIDTH};
