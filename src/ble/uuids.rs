//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants for the standard GATT services the probes
//! exercise, plus the Apple vendor services that are only checked for
//! presence. Components receive a [`UuidCatalog`] instead of reaching for
//! the constants directly, so a run can be pointed at a different table.

use uuid::Uuid;

/// Build a full 128-bit UUID from a 16-bit Bluetooth SIG assigned number.
pub const fn uuid16(short: u16) -> Uuid {
    Uuid::from_u128(0x0000_0000_0000_1000_8000_00805f9b34fb | ((short as u128) << 96))
}

// Generic Access Service (Standard BLE)
/// Generic Access Service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid = uuid16(0x1800);
/// Device Name characteristic UUID (Read).
pub const DEVICE_NAME_UUID: Uuid = uuid16(0x2a00);
/// Appearance characteristic UUID (Read).
pub const APPEARANCE_UUID: Uuid = uuid16(0x2a01);

// Generic Attribute Service (Standard BLE)
/// Generic Attribute Service UUID.
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid = uuid16(0x1801);
/// Service Changed characteristic UUID (Indicate/Notify).
pub const SERVICE_CHANGED_UUID: Uuid = uuid16(0x2a05);

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = uuid16(0x180a);
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = uuid16(0x2a29);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = uuid16(0x2a24);
/// Serial Number characteristic UUID.
pub const SERIAL_NUMBER_UUID: Uuid = uuid16(0x2a25);
/// Firmware Revision characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = uuid16(0x2a26);
/// Hardware Revision characteristic UUID.
pub const HARDWARE_REVISION_UUID: Uuid = uuid16(0x2a27);
/// Software Revision characteristic UUID.
pub const SOFTWARE_REVISION_UUID: Uuid = uuid16(0x2a28);

// Battery Service (Standard BLE)
/// Battery Service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = uuid16(0x180f);
/// Battery Level characteristic UUID (Read, Notify).
pub const BATTERY_LEVEL_UUID: Uuid = uuid16(0x2a19);

// Current Time Service (Standard BLE)
/// Current Time Service UUID.
pub const CURRENT_TIME_SERVICE_UUID: Uuid = uuid16(0x1805);
/// Current Time characteristic UUID (Read, Notify).
pub const CURRENT_TIME_UUID: Uuid = uuid16(0x2a2b);
/// Local Time Information characteristic UUID (Read).
pub const LOCAL_TIME_INFO_UUID: Uuid = uuid16(0x2a0f);

// Apple vendor services
/// Apple Continuity Service UUID.
pub const APPLE_CONTINUITY_SERVICE_UUID: Uuid =
    Uuid::from_u128(0xd061_1e78_bbb4_4591_a5f8_487910ae4366);
/// Apple Continuity characteristic UUID (Read, Notify).
pub const APPLE_CONTINUITY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x8667_556c_9a37_4c91_84ed_54ee27d90049);
/// Apple Nearby Interaction Service UUID.
pub const APPLE_NEARBY_INTERACTION_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x9fa4_80e0_4967_4542_9390_d343dc5d04ae);
/// Apple Nearby Interaction characteristic UUID (Read, Notify).
pub const APPLE_NEARBY_INTERACTION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xaf0b_adb1_5b99_43cd_917a_a77bc549e3cc);
/// Apple Notification Center Service (ANCS) UUID.
pub const ANCS_SERVICE_UUID: Uuid = Uuid::from_u128(0x7905_f431_b5ce_4e99_a40f_4b1e122d00d0);
/// ANCS Control Point characteristic UUID (Write).
pub const ANCS_CONTROL_POINT_UUID: Uuid = Uuid::from_u128(0x69d1_d8f3_45e1_49a8_9821_9bbdfdaad9d9);
/// ANCS Notification Source characteristic UUID (Notify).
pub const ANCS_NOTIFICATION_SOURCE_UUID: Uuid =
    Uuid::from_u128(0x9fbf_120d_6301_42d9_8c58_25e699a21dbd);
/// ANCS Data Source characteristic UUID (Notify).
pub const ANCS_DATA_SOURCE_UUID: Uuid = Uuid::from_u128(0x22ea_c6e9_24d6_4bb5_be44_b36ace7c7bfb);
/// Apple Media Service UUID.
pub const APPLE_MEDIA_SERVICE_UUID: Uuid = Uuid::from_u128(0x89d3_502b_0f36_433a_8ef4_c502ad55f8dc);
/// Apple Media Remote Command characteristic UUID (Write, Notify).
pub const APPLE_MEDIA_REMOTE_COMMAND_UUID: Uuid =
    Uuid::from_u128(0x9b3c_81d8_57b1_4a8a_b8df_0e56f7ca51c2);
/// Apple Media Entity Update characteristic UUID (Write, Notify).
pub const APPLE_MEDIA_ENTITY_UPDATE_UUID: Uuid =
    Uuid::from_u128(0x2f7c_abce_808d_411f_9a0c_bb92ba96c102);
/// Apple Media Entity Attribute characteristic UUID (Read, Write).
pub const APPLE_MEDIA_ENTITY_ATTRIBUTE_UUID: Uuid =
    Uuid::from_u128(0xc6b2_f38c_23ab_46d8_a6ab_a3a870bbd5d7);

/// Symbolic names for the entries of a [`UuidCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GattName {
    GenericAccess,
    DeviceName,
    Appearance,
    GenericAttribute,
    ServiceChanged,
    DeviceInformation,
    ManufacturerName,
    ModelNumber,
    SerialNumber,
    FirmwareRevision,
    HardwareRevision,
    SoftwareRevision,
    BatteryService,
    BatteryLevel,
    CurrentTimeService,
    CurrentTime,
    LocalTimeInformation,
    AppleContinuity,
    AppleContinuityCharacteristic,
    AppleNearbyInteraction,
    AppleNearbyInteractionCharacteristic,
    Ancs,
    AncsControlPoint,
    AncsNotificationSource,
    AncsDataSource,
    AppleMedia,
    AppleMediaRemoteCommand,
    AppleMediaEntityUpdate,
    AppleMediaEntityAttribute,
}

/// One row of the UUID catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Symbolic name used by the probes.
    pub name: GattName,
    /// The UUID the name resolves to.
    pub uuid: Uuid,
    /// Human-readable description printed during discovery.
    pub description: &'static str,
}

const fn entry(name: GattName, uuid: Uuid, description: &'static str) -> CatalogEntry {
    CatalogEntry {
        name,
        uuid,
        description,
    }
}

/// The built-in table of standard and Apple vendor UUIDs.
pub static STANDARD_ENTRIES: &[CatalogEntry] = &[
    entry(GattName::GenericAccess, GENERIC_ACCESS_SERVICE_UUID, "Generic Access Profile"),
    entry(GattName::DeviceName, DEVICE_NAME_UUID, "Device Name"),
    entry(GattName::Appearance, APPEARANCE_UUID, "Appearance"),
    entry(GattName::GenericAttribute, GENERIC_ATTRIBUTE_SERVICE_UUID, "Generic Attribute Profile"),
    entry(GattName::ServiceChanged, SERVICE_CHANGED_UUID, "Service Changed"),
    entry(GattName::DeviceInformation, DEVICE_INFO_SERVICE_UUID, "Device Information"),
    entry(GattName::ManufacturerName, MANUFACTURER_NAME_UUID, "Manufacturer Name String"),
    entry(GattName::ModelNumber, MODEL_NUMBER_UUID, "Model Number String"),
    entry(GattName::SerialNumber, SERIAL_NUMBER_UUID, "Serial Number String"),
    entry(GattName::FirmwareRevision, FIRMWARE_REVISION_UUID, "Firmware Revision String"),
    entry(GattName::HardwareRevision, HARDWARE_REVISION_UUID, "Hardware Revision String"),
    entry(GattName::SoftwareRevision, SOFTWARE_REVISION_UUID, "Software Revision String"),
    entry(GattName::BatteryService, BATTERY_SERVICE_UUID, "Battery Service"),
    entry(GattName::BatteryLevel, BATTERY_LEVEL_UUID, "Battery Level"),
    entry(GattName::CurrentTimeService, CURRENT_TIME_SERVICE_UUID, "Current Time Service"),
    entry(GattName::CurrentTime, CURRENT_TIME_UUID, "Current Time"),
    entry(GattName::LocalTimeInformation, LOCAL_TIME_INFO_UUID, "Local Time Information"),
    entry(GattName::AppleContinuity, APPLE_CONTINUITY_SERVICE_UUID, "Apple Continuity Service"),
    entry(
        GattName::AppleContinuityCharacteristic,
        APPLE_CONTINUITY_CHARACTERISTIC_UUID,
        "Apple Continuity Characteristic",
    ),
    entry(
        GattName::AppleNearbyInteraction,
        APPLE_NEARBY_INTERACTION_SERVICE_UUID,
        "Apple Nearby Interaction",
    ),
    entry(
        GattName::AppleNearbyInteractionCharacteristic,
        APPLE_NEARBY_INTERACTION_CHARACTERISTIC_UUID,
        "Apple Nearby Interaction Characteristic",
    ),
    entry(GattName::Ancs, ANCS_SERVICE_UUID, "Apple Notification Center Service"),
    entry(GattName::AncsControlPoint, ANCS_CONTROL_POINT_UUID, "ANCS Control Point"),
    entry(
        GattName::AncsNotificationSource,
        ANCS_NOTIFICATION_SOURCE_UUID,
        "ANCS Notification Source",
    ),
    entry(GattName::AncsDataSource, ANCS_DATA_SOURCE_UUID, "ANCS Data Source"),
    entry(GattName::AppleMedia, APPLE_MEDIA_SERVICE_UUID, "Apple Media Service"),
    entry(
        GattName::AppleMediaRemoteCommand,
        APPLE_MEDIA_REMOTE_COMMAND_UUID,
        "AMS Remote Command",
    ),
    entry(
        GattName::AppleMediaEntityUpdate,
        APPLE_MEDIA_ENTITY_UPDATE_UUID,
        "AMS Entity Update",
    ),
    entry(
        GattName::AppleMediaEntityAttribute,
        APPLE_MEDIA_ENTITY_ATTRIBUTE_UUID,
        "AMS Entity Attribute",
    ),
];

/// Read-only mapping from symbolic name to UUID and description.
#[derive(Debug, Clone, Copy)]
pub struct UuidCatalog {
    entries: &'static [CatalogEntry],
}

impl UuidCatalog {
    /// Catalog over the built-in [`STANDARD_ENTRIES`] table.
    pub fn standard() -> Self {
        Self::new(STANDARD_ENTRIES)
    }

    /// Catalog over a caller-supplied table.
    pub fn new(entries: &'static [CatalogEntry]) -> Self {
        Self { entries }
    }

    /// Resolve a symbolic name.
    ///
    /// Names missing from the table resolve to the nil UUID, which never
    /// matches a discovered attribute.
    pub fn uuid(&self, name: GattName) -> Uuid {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.uuid)
            .unwrap_or_default()
    }

    /// Human-readable description for a UUID, or `"Unknown"`.
    pub fn describe(&self, uuid: &Uuid) -> &'static str {
        self.entries
            .iter()
            .find(|e| e.uuid == *uuid)
            .map(|e| e.description)
            .unwrap_or("Unknown")
    }

    /// All entries of the table.
    pub fn entries(&self) -> &'static [CatalogEntry] {
        self.entries
    }
}

impl Default for UuidCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
