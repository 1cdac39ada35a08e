//! Test orchestrator.
//!
//! Sequences one diagnostic run: primary connection, readiness wait,
//! discovery, the four probes and the vendor-service check, then cleanup.
//! Nothing raised inside the run escapes [`DeviceTester::run_all_tests`].

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::ble::characteristics::ResilientReader;
use crate::ble::connection::ConnectionManager;
use crate::ble::readiness::{ReadinessOutcome, ReadinessSignal, ServiceReadinessGate};
use crate::ble::transport::{BleTransport, ServiceCatalog};
use crate::ble::uuids::{GattName, UuidCatalog};
use crate::config::ProbeConfig;
use crate::data::BatteryLevel;
use crate::error::Result;
use crate::probes::{
    BatteryProbe, CurrentTimeProbe, CurrentTimeReport, DeviceInformationProbe,
    DeviceInformationReport, GenericAccessProbe, GenericAccessReport, ProbeContext,
};
use crate::report::Report;

/// Where a run is in its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestPhase {
    /// Nothing done yet.
    #[default]
    Idle,
    /// Primary connection open.
    Connected,
    /// Readiness wait finished (by any outcome).
    ServicesWaited,
    /// Services enumerated and snapshotted.
    Discovered,
    /// All probes and the vendor check ran.
    Probed,
    /// Tearing down.
    Cleanup,
    /// Run finished.
    Done,
}

impl std::fmt::Display for TestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connected => "Connected",
            Self::ServicesWaited => "ServicesWaited",
            Self::Discovered => "Discovered",
            Self::Probed => "Probed",
            Self::Cleanup => "Cleanup",
            Self::Done => "Done",
        };
        f.write_str(name)
    }
}

/// What a run observed.
#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    /// Last phase reached before cleanup.
    pub phase_reached: TestPhase,
    /// How the readiness wait ended.
    pub readiness: Option<ReadinessOutcome>,
    /// Discovered services.
    pub services: ServiceCatalog,
    /// Generic Access probe result.
    pub generic_access: Option<GenericAccessReport>,
    /// Device Information probe result.
    pub device_information: Option<DeviceInformationReport>,
    /// Battery probe result.
    pub battery: Option<BatteryLevel>,
    /// Current Time probe result.
    pub current_time: Option<CurrentTimeReport>,
    /// Whether the configured vendor service was discovered.
    pub vendor_service_available: Option<bool>,
    /// The error that ended the run early, if any.
    pub error: Option<String>,
}

/// Runs the diagnostic sequence against one peripheral.
pub struct DeviceTester {
    config: ProbeConfig,
    catalog: UuidCatalog,
    connection: ConnectionManager,
    readiness: ReadinessSignal,
    phase: TestPhase,
    report: Report,
}

impl DeviceTester {
    /// Create a tester that connects through `transport`.
    pub fn new(
        transport: Arc<dyn BleTransport>,
        config: ProbeConfig,
        catalog: UuidCatalog,
        report: Report,
    ) -> Self {
        let connection = ConnectionManager::new(transport, config.address.clone())
            .with_reconnect_timeout(config.reconnect_timeout);

        Self {
            config,
            catalog,
            connection,
            readiness: ReadinessSignal::new(),
            phase: TestPhase::Idle,
            report,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> TestPhase {
        self.phase
    }

    /// Output written so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Run every step, then clean up whatever happened.
    pub async fn run_all_tests(&mut self) -> TestSummary {
        let mut summary = TestSummary::default();

        if let Err(e) = self.run_sequence(&mut summary).await {
            error!("Test run aborted in phase {}: {}", self.phase, e);
            self.report.line(format!("Error while running tests: {}", e));
            summary.error = Some(e.to_string());
        }

        summary.phase_reached = self.phase;
        self.cleanup().await;
        summary
    }

    async fn run_sequence(&mut self, summary: &mut TestSummary) -> Result<()> {
        self.report
            .line(format!("Connecting to device ({})...", self.config.address));
        let link = self.connection.connect(self.config.connect_timeout).await?;
        self.report.line("Connected!");
        self.advance(TestPhase::Connected);

        let gate = ServiceReadinessGate::new(&self.catalog, &self.readiness);
        let outcome = gate
            .wait_for_services(link.as_ref(), self.config.readiness_timeout, &mut self.report)
            .await;
        summary.readiness = Some(outcome);
        self.advance(TestPhase::ServicesWaited);

        let services = ServiceCatalog::new(link.list_services().await?);
        self.print_discovery(&services);
        self.advance(TestPhase::Discovered);

        let mut ctx = ProbeContext {
            connection: &mut self.connection,
            services: &services,
            catalog: &self.catalog,
            reader: ResilientReader::new(self.config.retry),
            display_width: self.config.display_width,
            report: &mut self.report,
        };
        summary.generic_access = GenericAccessProbe::run(&mut ctx).await;
        summary.device_information = DeviceInformationProbe::run(&mut ctx).await;
        summary.battery = BatteryProbe::run(&mut ctx).await;
        summary.current_time = CurrentTimeProbe::run(&mut ctx).await;

        let vendor = self.config.vendor_service;
        let available = services.contains_str(&vendor.to_string());
        let name = self.catalog.describe(&vendor);
        self.report.line("");
        if available {
            self.report.line(format!("{} ({}) available", name, vendor));
        } else {
            self.report.line(format!("{} ({}) unavailable", name, vendor));
        }
        summary.vendor_service_available = Some(available);
        summary.services = services;
        self.advance(TestPhase::Probed);

        Ok(())
    }

    fn print_discovery(&mut self, services: &ServiceCatalog) {
        self.report.section("Discovered services and characteristics:");
        for service in services.iter() {
            self.report.section(format!("Service: {}", service.uuid));
            self.report
                .line(format!("  Description: {}", service.description));
            self.report.line("  Characteristics:");
            for characteristic in &service.characteristics {
                self.report
                    .line(format!("    - UUID: {}", characteristic.uuid));
                self.report
                    .line(format!("      Description: {}", characteristic.description));
                let labels = characteristic.property_labels();
                if !labels.is_empty() {
                    self.report
                        .line(format!("      Properties: {}", labels.join(", ")));
                }
            }
        }

        self.report.section("Available services:");
        for service in services.iter() {
            self.report
                .line(format!("- {}: {}", service.uuid, service.description));
        }
    }

    /// Unsubscribe and disconnect. Failures are logged, never returned.
    async fn cleanup(&mut self) {
        self.advance(TestPhase::Cleanup);

        if let Some(link) = self.connection.connection() {
            let changed = self.catalog.uuid(GattName::ServiceChanged);
            best_effort("stop Service Changed notifications", link.stop_notify(&changed).await);
            best_effort("disconnect", self.connection.disconnect().await);
        }

        self.advance(TestPhase::Done);
        info!("Test run finished");
    }

    fn advance(&mut self, phase: TestPhase) {
        debug!("Test phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

/// Log a failed cleanup step without rethrowing it.
fn best_effort(step: &str, result: Result<()>) {
    if let Err(e) = result {
        debug!("Cleanup step '{}' failed: {}", step, e);
    }
}
