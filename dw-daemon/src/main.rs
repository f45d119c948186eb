//! Driftwatch Daemon (driftwatchd)
//!
//! Samples local clock drift at a fixed cadence, feeds it through the
//! compensating predictor and appends every tick to a CSV log.
//!
//! # Lifecycle
//! - **Startup**: parse args, initialise logging, load settings
//! - **Composition**: pick a HAL, derive compensation, open the log sink
//! - **Sampling**: one tick per interval until a signal or the sample limit
//! - **Shutdown**: SIGINT/SIGTERM set a flag the loop polls once per tick

mod sampling;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use dw_core::constants::paths;
use dw_core::hal::Hal;
use dw_core::{
    Collector, Compensation, CsvDriftLog, DriftPredictor, DriftSettings, EnvironmentAwarePredictor,
    HostDriftClock, HostHal, SimulatedHal, TmbValidator,
};
use tracing::{debug, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    samples: Option<u64>,
    simulate: bool,
}

fn print_help() {
    eprintln!("driftwatchd {} - Clock drift sampling daemon", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    driftwatchd [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config PATH   Settings file (default: ~/.config/driftwatch/settings.json)");
    eprintln!("    -l, --log-dir DIR   Directory for drift CSV logs (default: ./logs)");
    eprintln!("    -n, --samples N     Stop after N recorded samples");
    eprintln!("    -s, --simulate      Use simulated sensors instead of host thermal zones");
    eprintln!("    -v, --version       Print version");
    eprintln!("    -h, --help          Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    DRIFTWATCH_LOG      Log filter (trace, debug, info, warn, error)");
}

fn print_version() {
    println!("driftwatchd {}", VERSION);
}

/// `Ok(None)` means help or version was printed and the process should exit
fn parse_args(args: &[String]) -> anyhow::Result<Option<Args>> {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-v" | "--version" => {
                print_version();
                return Ok(None);
            }
            "-s" | "--simulate" => parsed.simulate = true,
            flag @ ("-c" | "--config" | "-l" | "--log-dir" | "-n" | "--samples") => {
                i += 1;
                let value = args
                    .get(i)
                    .with_context(|| format!("{} requires an argument", flag))?;
                match flag {
                    "-c" | "--config" => parsed.config = Some(PathBuf::from(value)),
                    "-l" | "--log-dir" => parsed.log_dir = Some(PathBuf::from(value)),
                    _ => {
                        let n = value
                            .parse::<u64>()
                            .with_context(|| format!("invalid sample count: {}", value))?;
                        parsed.samples = Some(n);
                    }
                }
            }
            arg => {
                print_help();
                anyhow::bail!("unknown argument: {}", arg);
            }
        }
        i += 1;
    }
    Ok(Some(parsed))
}

// ============================================================================
// Logging
// ============================================================================

/// Journald when the socket exists, stdout otherwise. Returns true for journald.
fn init_logging(filter: &str) -> bool {
    use tracing_subscriber::prelude::*;

    if std::path::Path::new("/run/systemd/journal/socket").exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(filter))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();
    false
}

// ============================================================================
// Composition
// ============================================================================

async fn run_with_hal<H: Hal>(
    hal: H,
    settings: &DriftSettings,
    log_dir: PathBuf,
    shutdown: Arc<AtomicBool>,
    max_samples: Option<u64>,
) -> anyhow::Result<()> {
    let compensation = settings
        .compensation
        .unwrap_or_else(|| Compensation::for_clock_source(hal.clock_source()));
    info!(clock_source = ?hal.clock_source(), ?compensation, "STARTUP: HAL ready");

    let predictor = EnvironmentAwarePredictor::with_compensation(
        hal,
        DriftPredictor::new(settings.predictor.clone()),
        compensation,
    );

    let log = CsvDriftLog::create(&log_dir)
        .with_context(|| format!("failed to create drift log in {}", log_dir.display()))?;
    info!("STARTUP: Logging samples to {}", log.path().display());

    let mut collector = Collector::new(
        settings.collector.clone(),
        Box::new(HostDriftClock::new()),
        Box::new(log),
        predictor,
    );
    let mut validator = TmbValidator::new(settings.validator.clone());

    let summary =
        sampling::run_sampling_loop(&mut collector, &mut validator, shutdown, max_samples).await;
    info!(
        "SHUTDOWN: {} samples recorded over {} ticks",
        summary.recorded, summary.ticks
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // PHASE 1: Parse arguments
    let argv: Vec<String> = std::env::args().collect();
    let Some(args) = parse_args(&argv)? else {
        return Ok(());
    };

    // PHASE 2: Logging
    let log_filter = std::env::var("DRIFTWATCH_LOG").unwrap_or_else(|_| "info".to_string());
    let use_journald = init_logging(&log_filter);
    info!("STARTUP: driftwatchd {} starting", VERSION);
    info!("STARTUP: Logging to {}", if use_journald { "systemd journal" } else { "stdout" });

    // PHASE 3: Settings
    let settings_path = match args.config {
        Some(path) => path,
        None => dw_core::default_settings_path()?,
    };
    let settings = dw_core::load_settings(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
    info!("STARTUP: Settings from {}", settings_path.display());
    debug!("Effective settings: {}", serde_json::to_string(&settings)?);

    // PHASE 4: Signal handling
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - stopping after current tick");
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set signal handler: {}. Use --samples to bound the run.", e);
    }

    // PHASE 5: Run
    let log_dir = args.log_dir.unwrap_or_else(|| PathBuf::from(paths::LOG_DIR));
    if args.simulate {
        run_with_hal(SimulatedHal::new(), &settings, log_dir, shutdown, args.samples).await
    } else {
        run_with_hal(HostHal::new(), &settings, log_dir, shutdown, args.samples).await
    }
}
