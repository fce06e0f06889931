//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values take the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{PayloadError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Hot-spot detector configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// Lower bound of the qualifying window (°C)
    #[serde(default = "default_min_temp")]
    pub min_temp: f32,

    /// Upper bound of the qualifying window (°C)
    #[serde(default = "default_max_temp")]
    pub max_temp: f32,

    /// Hot spots kept per scan (clamped to 1..=32 by the detector)
    #[serde(default = "default_max_spots")]
    pub max_spots: usize,
}

/// Thermal camera optics
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default = "default_horizontal_fov_deg")]
    pub horizontal_fov_deg: f64,
}

/// Which radio transport to build
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RadioMode {
    /// In-memory link with a simulated ground station
    Loopback,
    /// Radio modem on a serial port
    Serial,
}

/// Radio link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_radio_mode")]
    pub mode: RadioMode,

    /// Serial device path; empty means try the usual USB serial devices
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long a receive waits for a complete frame
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Signal strength reported by the loopback link (dBm)
    #[serde(default = "default_loopback_rssi")]
    pub loopback_rssi: i32,
}

/// Telemetry cycle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CycleConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Initial state of the video transmitter flag
    #[serde(default = "default_vtx_on")]
    pub vtx_on: bool,
}

/// Simulated sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Fixed seed for reproducible runs; random when absent
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_max_blobs")]
    pub max_blobs: usize,

    #[serde(default)]
    pub thermal_failure_probability: f64,
}

/// On-board log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_min_temp() -> f32 { 0.0 }
fn default_max_temp() -> f32 { 100.0 }
fn default_max_spots() -> usize { 3 }

fn default_horizontal_fov_deg() -> f64 { 110.0 }

fn default_radio_mode() -> RadioMode { RadioMode::Loopback }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }
fn default_loopback_rssi() -> i32 { -70 }

fn default_interval_ms() -> u64 { 1000 }
fn default_vtx_on() -> bool { true }

fn default_max_blobs() -> usize { 3 }

fn default_log_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_temp: default_min_temp(),
            max_temp: default_max_temp(),
            max_spots: default_max_spots(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: default_horizontal_fov_deg(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            mode: default_radio_mode(),
            port: String::new(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            loopback_rssi: default_loopback_rssi(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            vtx_on: default_vtx_on(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_blobs: default_max_blobs(),
            thermal_failure_probability: 0.0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> PayloadError {
    PayloadError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cansat_payload::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if the file exists
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - No file at `path`
    /// * `Ok(Some(config))` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load_if_present<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Load configuration from `path`, or use defaults if the file does not
    /// exist
    ///
    /// # Errors
    ///
    /// Same as [`Config::load_if_present`].
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::load_if_present(path)?.unwrap_or_default())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Detector window
        if !self.detector.min_temp.is_finite() || !self.detector.max_temp.is_finite() {
            return Err(invalid("detector temperatures must be finite"));
        }

        if self.detector.min_temp > self.detector.max_temp {
            return Err(invalid("min_temp must not exceed max_temp"));
        }

        // Camera optics
        if !(self.camera.horizontal_fov_deg > 0.0 && self.camera.horizontal_fov_deg < 180.0) {
            return Err(invalid("horizontal_fov_deg must be between 0 and 180 (exclusive)"));
        }

        // Radio link
        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600]
            .contains(&self.radio.baud_rate)
        {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.radio.timeout_ms == 0 || self.radio.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // Cycle timing
        if self.cycle.interval_ms == 0 || self.cycle.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 1 and 60000"));
        }

        // Simulation
        if !(0.0..=1.0).contains(&self.simulation.thermal_failure_probability) {
            return Err(invalid("thermal_failure_probability must be between 0.0 and 1.0"));
        }

        // On-board log
        if self.log.enabled && self.log.log_dir.is_empty() {
            return Err(invalid("log_dir cannot be empty when enabled"));
        }

        if self.log.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.log.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
