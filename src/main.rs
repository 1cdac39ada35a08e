//! `ble-service-probe` command-line entry point.
//!
//! By default the binary acts as the supervisor: it re-executes itself with
//! `--worker`, watches the worker under the watchdog and always exits 0.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ble_service_probe::ble::uuids::ANCS_SERVICE_UUID;
use ble_service_probe::config::DEFAULT_DEVICE_ADDRESS;
use ble_service_probe::watchdog::{shutdown_signal, ChildWorker, Watchdog, WatchdogOutcome};
use ble_service_probe::{BtleplugTransport, DeviceTester, ProbeConfig, Report, UuidCatalog};

const DEFAULT_LOG_FILTER: &str = "ble_service_probe=info,btleplug=warn";
const VERBOSE_LOG_FILTER: &str = "ble_service_probe=debug,btleplug=info";

/// One-shot diagnostic probe for a BLE peripheral's standard services.
#[derive(Parser, Debug)]
#[command(name = "ble-service-probe", version, about)]
struct Cli {
    /// Address (or platform identifier) of the peripheral
    #[arg(short, long, default_value = DEFAULT_DEVICE_ADDRESS)]
    address: String,

    /// Seconds the run may take before it is stopped
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Vendor service whose presence is reported
    #[arg(long, default_value_t = ANCS_SERVICE_UUID)]
    vendor_service: Uuid,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run the diagnostics in this process
    #[arg(long, hide = true)]
    worker: bool,
}

impl Cli {
    fn config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::for_address(self.address.clone());
        config.vendor_service = self.vendor_service;
        config.watchdog = config
            .watchdog
            .with_timeout(Duration::from_secs(self.timeout));
        config
    }

    /// Arguments forwarded to the worker process.
    fn worker_args(&self) -> Vec<String> {
        let mut args = vec![
            "--address".to_string(),
            self.address.clone(),
            "--timeout".to_string(),
            self.timeout.to_string(),
            "--vendor-service".to_string(),
            self.vendor_service.to_string(),
        ];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_worker(config: ProbeConfig) {
    let catalog = UuidCatalog::standard();

    let transport = match BtleplugTransport::new(catalog).await {
        Ok(transport) => transport,
        Err(e) => {
            error!("Bluetooth setup failed: {}", e);
            let mut report = Report::stdout();
            report.line(format!("Error while running tests: {}", e));
            return;
        }
    };

    let mut tester = DeviceTester::new(Arc::new(transport), config, catalog, Report::stdout());
    let summary = tester.run_all_tests().await;
    info!(
        "Run finished after phase {} with {} services",
        summary.phase_reached,
        summary.services.len()
    );
}

async fn run_supervisor(cli: &Cli, config: &ProbeConfig) {
    let mut worker = match ChildWorker::spawn(&cli.worker_args()) {
        Ok(worker) => worker,
        Err(e) => {
            error!("Unable to start worker: {}", e);
            return;
        }
    };
    info!("Worker started (pid {:?})", worker.id());

    let watchdog = Watchdog::new(config.watchdog);
    match watchdog.supervise(&mut worker, shutdown_signal()).await {
        WatchdogOutcome::Completed => info!("Diagnostics complete"),
        WatchdogOutcome::TimedOut => {
            warn!("Diagnostics timed out after {:?}", config.watchdog.timeout);
            println!("Test timed out, forced exit");
        }
        WatchdogOutcome::Interrupted => println!("Test interrupted"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    if cli.worker {
        run_worker(config).await;
    } else {
        run_supervisor(&cli, &config).await;
    }

    std::process::exit(0);
}
