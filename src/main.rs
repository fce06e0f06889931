//! # CanSat Payload
//!
//! Thermal hot-spot detection and telemetry downlink for a CanSat payload.
//!
//! Once per cycle the payload reads its flight sensors, picks the hottest
//! pixels of a thermal frame, projects them onto the ground and sends the
//! resulting telemetry frame over the radio.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use cansat_payload::config::{Config, LogConfig, RadioConfig, RadioMode};
use cansat_payload::flight::{FlightComputer, SimulatedFlightSensors};
use cansat_payload::geo::CameraModel;
use cansat_payload::ground::GroundStation;
use cansat_payload::radio::{LoopbackRadio, RadioTransport, SerialRadio};
use cansat_payload::telemetry::log::FileLog;
use cansat_payload::thermal::detector::HotSpotDetector;
use cansat_payload::thermal::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use cansat_payload::thermal::source::SimulatedThermalSource;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Environment variable naming the configuration file
const CONFIG_ENV_VAR: &str = "CANSAT_CONFIG";

/// Configuration file used when the environment variable is unset
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of cycles between status log messages
const STATUS_INTERVAL_CYCLES: u64 = 10;

/// Log file prefixes inside the log directory
const FRAME_LOG_PREFIX: &str = "frames";
const GROUND_LOG_PREFIX: &str = "ground";
const TRACE_LOG_FILE: &str = "cansat-payload.log";

/// Main entry point for the payload
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration
///    - Set up logging (console, plus a daily file when the log is enabled)
///    - Build sensors, detector, radio and on-board log
///
/// 2. **Main Loop**
///    - Run one flight cycle per interval tick
///    - With the loopback radio, drain the in-process ground station
///    - Log status every few cycles
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid, the log directory cannot
/// be created, or the radio cannot be opened.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path();
    let loaded = Config::load_if_present(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let using_defaults = loaded.is_none();
    let config = loaded.unwrap_or_default();

    let _trace_guard = init_tracing(&config.log)?;

    info!("CanSat payload v{} starting...", env!("CARGO_PKG_VERSION"));
    if using_defaults {
        info!("No configuration at {}, using defaults", config_path.display());
    } else {
        info!("Loaded configuration from {}", config_path.display());
    }

    let seed = config.simulation.seed.unwrap_or_else(rand::random);
    info!("Simulation seed: {}", seed);

    let detector = HotSpotDetector::new(
        config.detector.min_temp,
        config.detector.max_temp,
        config.detector.max_spots,
    );
    let thermal = SimulatedThermalSource::new(StdRng::seed_from_u64(seed))
        .with_max_blobs(config.simulation.max_blobs)
        .with_failure_probability(config.simulation.thermal_failure_probability);
    let sensors = SimulatedFlightSensors::from_seed(seed.wrapping_add(1));

    let (radio, mut ground) = build_radio(&config)?;

    let camera = CameraModel::new(FRAME_WIDTH, FRAME_HEIGHT, config.camera.horizontal_fov_deg);
    let mut computer = FlightComputer::new(detector, Box::new(thermal), Box::new(sensors), radio)
        .with_camera(camera);
    computer.set_vtx_on(config.cycle.vtx_on);

    if config.log.enabled {
        let frame_log = FileLog::open(
            &config.log.log_dir,
            FRAME_LOG_PREFIX,
            config.log.max_records_per_file,
            config.log.max_files_to_keep,
        )?;
        computer = computer.with_log(Box::new(frame_log));
    }

    let mut cycle_interval = interval(Duration::from_millis(config.cycle.interval_ms));

    info!("Starting telemetry cycle every {} ms", config.cycle.interval_ms);
    info!("Press Ctrl+C to exit");

    let mut failed_cycles: u64 = 0;

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                if let Err(e) = computer.run_cycle(unix_seconds()).await {
                    failed_cycles += 1;
                    warn!("Telemetry cycle failed: {}", e);
                    continue;
                }

                if let Some(station) = ground.as_mut() {
                    if let Err(e) = station.drain().await {
                        warn!("Ground station receive failed: {}", e);
                    }
                }

                if computer.cycles() % STATUS_INTERVAL_CYCLES == 0 {
                    info!("Sent {} frames ({} failed cycles)", computer.cycles(), failed_cycles);
                    if let Some(station) = ground.as_ref() {
                        info!(
                            "Ground: {} received, {} malformed, latest {}",
                            station.received(),
                            station.malformed(),
                            station.latest()
                        );
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total frames sent: {}", computer.cycles());
                break;
            }
        }
    }

    Ok(())
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Install the tracing subscriber
///
/// The returned guard must live until shutdown so buffered file output is
/// flushed.
fn init_tracing(log: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = if log.enabled {
        std::fs::create_dir_all(&log.log_dir)
            .with_context(|| format!("creating log directory {}", log.log_dir))?;
        let appender = tracing_appender::rolling::daily(&log.log_dir, TRACE_LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Build the flight-side radio and, for the loopback link, the in-process
/// ground station listening on the other end
fn build_radio(config: &Config) -> Result<(Box<dyn RadioTransport>, Option<GroundStation>)> {
    match config.radio.mode {
        RadioMode::Loopback => {
            let flight_side = LoopbackRadio::new(config.radio.loopback_rssi);
            let mut station = GroundStation::new(Box::new(flight_side.clone()));
            if config.log.enabled {
                let ground_log = FileLog::open(
                    &config.log.log_dir,
                    GROUND_LOG_PREFIX,
                    config.log.max_records_per_file,
                    config.log.max_files_to_keep,
                )?;
                station = station.with_log(Box::new(ground_log));
            }
            info!("Using loopback radio with simulated ground station");
            Ok((Box::new(flight_side), Some(station)))
        }
        RadioMode::Serial => {
            let radio = open_serial(&config.radio)?;
            info!("Radio modem opened at: {}", radio.device_path());
            Ok((Box::new(radio), None))
        }
    }
}

fn open_serial(radio: &RadioConfig) -> Result<SerialRadio> {
    let timeout = Duration::from_millis(radio.timeout_ms);
    let serial = if radio.port.is_empty() {
        SerialRadio::open(radio.baud_rate, timeout)?
    } else {
        SerialRadio::open_with_paths(&[radio.port.as_str()], radio.baud_rate, timeout)?
    };
    Ok(serial)
}

/// Current time in seconds since the Unix epoch, millisecond resolution
fn unix_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
