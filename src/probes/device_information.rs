//! Device Information probe: lists the service and reads manufacturer/model.

use crate::ble::characteristics::CharacteristicDescriptor;
use crate::ble::transport::CharacteristicInfo;
use crate::ble::uuids::GattName;
use crate::data::truncate_for_display;
use crate::error::Result;

use super::ProbeContext;

/// What the Device Information probe found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInformationReport {
    /// Characteristics the service exposes.
    pub characteristics: Vec<CharacteristicInfo>,
    /// Manufacturer name, truncated for display.
    pub manufacturer: Option<String>,
    /// Model number, truncated for display.
    pub model: Option<String>,
}

/// Probe for the Device Information service.
pub struct DeviceInformationProbe;

impl DeviceInformationProbe {
    /// Label used in report lines.
    pub const LABEL: &'static str = "Device Information Service";

    /// Run the probe.
    pub async fn run(ctx: &mut ProbeContext<'_>) -> Option<DeviceInformationReport> {
        ctx.report.section(format!("Testing {}:", Self::LABEL));
        let result = Self::probe(ctx).await;
        ctx.finish(Self::LABEL, result)
    }

    async fn probe(ctx: &mut ProbeContext<'_>) -> Result<DeviceInformationReport> {
        let service = ctx.require_service(GattName::DeviceInformation).await?;

        ctx.report.section("Available device information characteristics:");
        for characteristic in &service.characteristics {
            ctx.report.line(format!(
                "- {}: {}",
                characteristic.uuid, characteristic.description
            ));
            let labels = characteristic.property_labels();
            if !labels.is_empty() {
                ctx.report
                    .line(format!("  Properties: {}", labels.join(", ")));
            }
        }

        ctx.report.section("Reading device information:");

        let manufacturer_uuid = ctx.catalog.uuid(GattName::ManufacturerName);
        let model_uuid = ctx.catalog.uuid(GattName::ModelNumber);
        let mut result = DeviceInformationReport {
            characteristics: service.characteristics.clone(),
            ..Default::default()
        };

        if service.has_characteristic(&manufacturer_uuid) {
            let descriptor = CharacteristicDescriptor::text(manufacturer_uuid, "manufacturer");
            if let Some(text) = Self::read_text(ctx, descriptor).await {
                ctx.report.line(format!("Manufacturer: {}", text));
                result.manufacturer = Some(text);
            }
        }

        if service.has_characteristic(&model_uuid) {
            let descriptor = CharacteristicDescriptor::text(model_uuid, "model number");
            if let Some(text) = Self::read_text(ctx, descriptor).await {
                ctx.report.line(format!("Model: {}", text));
                result.model = Some(text);
            }
        }

        Ok(result)
    }

    async fn read_text(
        ctx: &mut ProbeContext<'_>,
        descriptor: CharacteristicDescriptor,
    ) -> Option<String> {
        let value = ctx.read(descriptor).await?;
        let text = truncate_for_display(value.as_text()?, ctx.display_width);
        (!text.is_empty()).then(|| text.to_string())
    }
}
