//! # Flight Cycle
//!
//! Ties the payload together once per telemetry cycle:
//!
//! 1. read barometer / GPS / IMU through [`FlightSensors`]
//! 2. refresh hot spots from the thermal camera
//! 3. project hot spots onto the ground
//! 4. encode the snapshot and hand it to the radio
//! 5. append the frame to the on-board log
//!
//! Every collaborator is chosen once when the [`FlightComputer`] is built.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::geo::{CameraModel, VehiclePose};
use crate::radio::RadioTransport;
use crate::telemetry::generator::SyntheticSnapshotGenerator;
use crate::telemetry::log::PersistentLog;
use crate::telemetry::snapshot::TelemetrySnapshot;
use crate::thermal::detector::HotSpotDetector;
use crate::thermal::source::ThermalSensorSource;

/// Non-thermal sensor readings for one cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlightReadings {
    pub altitude: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub gps_time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl FlightReadings {
    /// Position and attitude used for hot-spot projection
    pub fn pose(&self) -> VehiclePose {
        VehiclePose {
            altitude: self.altitude,
            latitude: self.latitude,
            longitude: self.longitude,
            pitch: self.pitch,
            roll: self.roll,
            yaw: self.yaw,
        }
    }
}

impl From<TelemetrySnapshot> for FlightReadings {
    fn from(snapshot: TelemetrySnapshot) -> Self {
        Self {
            altitude: snapshot.altitude,
            temperature: snapshot.temperature,
            pressure: snapshot.pressure,
            gps_time: snapshot.gps_time,
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
            pitch: snapshot.pitch,
            roll: snapshot.roll,
            yaw: snapshot.yaw,
        }
    }
}

/// Barometer, GPS and IMU behind one call
#[cfg_attr(test, mockall::automock)]
pub trait FlightSensors: Send {
    /// Sample every non-thermal sensor
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if a reading could not be taken.
    fn read(&mut self) -> Result<FlightReadings>;
}

/// Flight sensors backed by the synthetic snapshot generator
pub struct SimulatedFlightSensors<R: Rng> {
    generator: SyntheticSnapshotGenerator<R>,
}

impl SimulatedFlightSensors<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            generator: SyntheticSnapshotGenerator::from_seed(seed),
        }
    }
}

impl<R: Rng> SimulatedFlightSensors<R> {
    pub fn new(rng: R) -> Self {
        Self {
            generator: SyntheticSnapshotGenerator::new(rng),
        }
    }
}

impl<R: Rng + Send> FlightSensors for SimulatedFlightSensors<R> {
    fn read(&mut self) -> Result<FlightReadings> {
        Ok(self.generator.generate(0.0).into())
    }
}

/// Outcome of one flight cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Frame handed to the radio
    pub frame: String,

    /// Hot spots found this cycle, or `None` if the thermal read failed and
    /// the previous list was reused
    pub new_hot_spots: Option<usize>,
}

/// Payload flight computer
pub struct FlightComputer {
    detector: HotSpotDetector,
    thermal: Box<dyn ThermalSensorSource>,
    sensors: Box<dyn FlightSensors>,
    radio: Box<dyn RadioTransport>,
    camera: CameraModel,
    log: Option<Box<dyn PersistentLog>>,
    vtx_on: bool,
    cycles: u64,
}

impl std::fmt::Debug for FlightComputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightComputer")
            .field("detector", &self.detector)
            .field("camera", &self.camera)
            .field("vtx_on", &self.vtx_on)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl FlightComputer {
    /// Assemble a flight computer with the default camera model, no log and
    /// the video transmitter off
    pub fn new(
        detector: HotSpotDetector,
        thermal: Box<dyn ThermalSensorSource>,
        sensors: Box<dyn FlightSensors>,
        radio: Box<dyn RadioTransport>,
    ) -> Self {
        Self {
            detector,
            thermal,
            sensors,
            radio,
            camera: CameraModel::default(),
            log: None,
            vtx_on: false,
            cycles: 0,
        }
    }

    #[must_use]
    pub fn with_camera(mut self, camera: CameraModel) -> Self {
        self.camera = camera;
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: Box<dyn PersistentLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Report the video transmitter as on or off in subsequent frames
    pub fn set_vtx_on(&mut self, on: bool) {
        if on != self.vtx_on {
            info!("Video transmitter {}", if on { "on" } else { "off" });
        }
        self.vtx_on = on;
    }

    pub fn vtx_on(&self) -> bool {
        self.vtx_on
    }

    pub fn detector(&self) -> &HotSpotDetector {
        &self.detector
    }

    /// Number of cycles that reached the radio
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one telemetry cycle stamped with `timestamp` (seconds)
    ///
    /// A thermal read failure does not fail the cycle: the previously
    /// published hot spots are sent again. A log failure is reported and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the flight-sensor error if readings could not be taken, or
    /// `Transport` if the radio rejected the frame.
    pub async fn run_cycle(&mut self, timestamp: f64) -> Result<CycleReport> {
        let readings = self.sensors.read()?;

        let new_hot_spots = match self.detector.detect(self.thermal.as_mut()) {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Reusing {} previous hot spots: {}", self.detector.found_count(), e);
                None
            }
        };

        let pose = readings.pose();
        let hot_spots = self.camera.project_all(self.detector.hot_spots(), &pose);

        let snapshot = TelemetrySnapshot {
            altitude: readings.altitude,
            temperature: readings.temperature,
            pressure: readings.pressure,
            gps_time: readings.gps_time,
            latitude: readings.latitude,
            longitude: readings.longitude,
            pitch: readings.pitch,
            roll: readings.roll,
            yaw: readings.yaw,
            vtx_on: self.vtx_on,
            hot_spots,
            timestamp,
        };
        let frame = snapshot.to_frame();

        self.radio.send(&frame).await?;
        self.cycles += 1;
        debug!("Cycle {}: {}", self.cycles, snapshot);

        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.append(&frame) {
                warn!("Failed to log telemetry frame: {}", e);
            }
        }

        Ok(CycleReport {
            frame,
            new_hot_spots,
        })
    }
}
