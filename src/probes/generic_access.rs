//! Generic Access probe: device name and appearance.

use crate::ble::characteristics::CharacteristicDescriptor;
use crate::ble::uuids::GattName;
use crate::data::Appearance;

use super::ProbeContext;

/// What the Generic Access probe found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericAccessReport {
    /// Device Name, if readable.
    pub device_name: Option<String>,
    /// Appearance, if readable.
    pub appearance: Option<Appearance>,
}

/// Reads Device Name and Appearance.
///
/// Operating systems commonly hide the Generic Access service from
/// discovery while still serving its characteristics, so this probe reads
/// them without requiring the service in the catalog.
pub struct GenericAccessProbe;

impl GenericAccessProbe {
    /// Label used in report lines.
    pub const LABEL: &'static str = "Generic Access Profile";

    /// Run the probe.
    pub async fn run(ctx: &mut ProbeContext<'_>) -> Option<GenericAccessReport> {
        ctx.report.section(format!("Testing {}:", Self::LABEL));

        let device_name = CharacteristicDescriptor::text(
            ctx.catalog.uuid(GattName::DeviceName),
            "device name",
        );
        let appearance = CharacteristicDescriptor::raw(
            ctx.catalog.uuid(GattName::Appearance),
            "appearance",
        );

        let mut result = GenericAccessReport::default();

        let name = ctx
            .read(device_name)
            .await
            .and_then(|v| v.as_text().map(|text| text.trim_end_matches('\0').to_owned()))
            .filter(|text| !text.is_empty());
        if let Some(name) = name {
            ctx.report.line(format!("Device name: {}", name));
            result.device_name = Some(name);
        }

        let appearance = ctx.read(appearance).await.filter(|v| !v.as_bytes().is_empty());
        if let Some(value) = appearance {
            let value = Appearance::from_bytes(value.as_bytes());
            ctx.report.line(format!("Appearance: {}", value));
            result.appearance = Some(value);
        }

        Some(result)
    }
}
