//! Battery probe.

use crate::ble::characteristics::CharacteristicDescriptor;
use crate::ble::uuids::GattName;
use crate::data::BatteryLevel;
use crate::error::{Error, Result};

use super::ProbeContext;

/// Probe for the Battery service.
pub struct BatteryProbe;

impl BatteryProbe {
    /// Label used in report lines.
    pub const LABEL: &'static str = "Battery Service";

    /// Run the probe.
    pub async fn run(ctx: &mut ProbeContext<'_>) -> Option<BatteryLevel> {
        ctx.report.section(format!("Testing {}:", Self::LABEL));
        let result = Self::probe(ctx).await;
        ctx.finish(Self::LABEL, result).flatten()
    }

    async fn probe(ctx: &mut ProbeContext<'_>) -> Result<Option<BatteryLevel>> {
        ctx.require_service(GattName::BatteryService).await?;

        let descriptor =
            CharacteristicDescriptor::raw(ctx.catalog.uuid(GattName::BatteryLevel), "battery level");
        let Some(value) = ctx.read(descriptor).await else {
            return Ok(None);
        };

        let level = BatteryLevel::from_bytes(value.as_bytes())?;
        if !level.is_valid() {
            return Err(Error::InvalidData {
                context: format!("battery level {} is above 100", level.percent()),
            });
        }

        ctx.report.line(format!("Battery level: {}", level));
        Ok(Some(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::mock::MockTransport;
    use crate::ble::uuids::*;
    use crate::probes::test_support::Harness;

    #[tokio::test(start_paused = true)]
    async fn test_reports_percentage() {
        let mut harness = Harness::new(MockTransport::standard_device()).await;

        let level = BatteryProbe::run(&mut harness.context()).await;

        assert_eq!(level.map(|l| l.percent()), Some(77));
        assert!(harness.report.contains("Battery level: 77%"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_level_is_reported_as_error() {
        let mock = MockTransport::standard_device();
        mock.set_value(BATTERY_LEVEL_UUID, vec![0xC8]);
        let mut harness = Harness::new(mock).await;

        let level = BatteryProbe::run(&mut harness.context()).await;

        assert_eq!(level, None);
        assert!(harness.report.contains("Error while testing Battery Service"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_payload_is_trapped() {
        let mock = MockTransport::standard_device();
        mock.set_value(BATTERY_LEVEL_UUID, vec![]);
        let mut harness = Harness::new(mock).await;

        assert_eq!(BatteryProbe::run(&mut harness.context()).await, None);
        assert!(harness.report.contains("Battery Level payload is empty"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_service() {
        let mock = MockTransport::standard_device();
        mock.remove_service(&BATTERY_SERVICE_UUID);
        let mut harness = Harness::new(mock).await;

        assert_eq!(BatteryProbe::run(&mut harness.context()).await, None);
        assert!(harness.report.contains("Device does not support Battery Service"));
        assert_eq!(harness.mock.read_calls(&BATTERY_LEVEL_UUID), 0);
    }
}
