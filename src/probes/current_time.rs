//! Current Time probe.

use tracing::debug;

use crate::ble::characteristics::CharacteristicDescriptor;
use crate::ble::uuids::GattName;
use crate::data::{CurrentTime, LocalTimeInfo};
use crate::error::Result;

use super::ProbeContext;

/// What the Current Time probe found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentTimeReport {
    /// Decoded Current Time, if readable.
    pub current_time: Option<CurrentTime>,
    /// Decoded Local Time Information, if the service exposes it.
    pub local_time: Option<LocalTimeInfo>,
}

/// Probe for the Current Time service.
pub struct CurrentTimeProbe;

impl CurrentTimeProbe {
    /// Label used in report lines.
    pub const LABEL: &'static str = "Current Time Service";

    /// Run the probe.
    pub async fn run(ctx: &mut ProbeContext<'_>) -> Option<CurrentTimeReport> {
        ctx.report.section(format!("Testing {}:", Self::LABEL));
        let result = Self::probe(ctx).await;
        ctx.finish(Self::LABEL, result)
    }

    async fn probe(ctx: &mut ProbeContext<'_>) -> Result<CurrentTimeReport> {
        let service = ctx.require_service(GattName::CurrentTimeService).await?;
        let mut result = CurrentTimeReport::default();

        let current = CharacteristicDescriptor::raw(ctx.catalog.uuid(GattName::CurrentTime), "current time");
        if let Some(value) = ctx.read(current).await {
            let time = CurrentTime::from_bytes(value.as_bytes())?;
            ctx.report.line(format!("Current time: {} ({})", time, time.day_of_week.name()));
            let reasons = time.adjust_reasons();
            if !reasons.is_empty() {
                ctx.report.line(format!("  Adjusted by: {}", reasons.join(", ")));
            }
            result.current_time = Some(time);
        }

        let local_uuid = ctx.catalog.uuid(GattName::LocalTimeInformation);
        if !service.has_characteristic(&local_uuid) {
            debug!("No Local Time Information characteristic");
            return Ok(result);
        }

        let local = CharacteristicDescriptor::raw(local_uuid, "local time information");
        if let Some(value) = ctx.read(local).await {
            let info = LocalTimeInfo::from_bytes(value.as_bytes())?;
            ctx.report.line(format!("Local time: {}", info));
            result.local_time = Some(info);
        }

        Ok(result)
    }
}
