//! # Thermal Sensor Sources
//!
//! Capability interface for anything that can produce a [`ThermalFrame`].
//!
//! The live MLX90640 driver (I2C register access) sits outside this crate and
//! implements [`ThermalSensorSource`] directly. [`SimulatedThermalSource`] is
//! the in-crate variant used for bench runs and tests. A source is chosen once
//! at construction; nothing branches on a "debug" flag per call.

use rand::Rng;
use tracing::debug;

use super::frame::{ThermalFrame, FRAME_HEIGHT, FRAME_WIDTH};
use crate::error::{PayloadError, Result};

/// Produces one thermal frame per call
#[cfg_attr(test, mockall::automock)]
pub trait ThermalSensorSource: Send {
    /// Capture a frame
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if the sensor did not deliver a frame.
    fn read_frame(&mut self) -> Result<ThermalFrame>;
}

/// Ambient temperature band for simulated background pixels (°C)
const BACKGROUND_MIN: f32 = 18.0;
const BACKGROUND_MAX: f32 = 26.0;

/// Peak temperature band for simulated hot blobs (°C)
const BLOB_PEAK_MIN: f32 = 40.0;
const BLOB_PEAK_MAX: f32 = 90.0;

/// Temperature drop per pixel of distance from a blob centre (°C)
const BLOB_FALLOFF: f32 = 6.0;

/// Synthetic thermal camera driven by an injected random source
///
/// Each frame is a noisy ambient background with a few warm blobs.
pub struct SimulatedThermalSource<R: Rng> {
    rng: R,
    max_blobs: usize,
    failure_probability: f64,
}

impl<R: Rng> SimulatedThermalSource<R> {
    /// Create a source producing up to 3 blobs per frame and never failing
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            max_blobs: 3,
            failure_probability: 0.0,
        }
    }

    /// Upper bound on the number of warm blobs per frame
    #[must_use]
    pub fn with_max_blobs(mut self, max_blobs: usize) -> Self {
        self.max_blobs = max_blobs;
        self
    }

    /// Probability (0.0 to 1.0) that a read reports the sensor unavailable
    #[must_use]
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn add_blob(&mut self, frame: &mut ThermalFrame) {
        let centre_col = self.rng.gen_range(0..FRAME_WIDTH) as i64;
        let centre_row = self.rng.gen_range(0..FRAME_HEIGHT) as i64;
        let peak = self.rng.gen_range(BLOB_PEAK_MIN..BLOB_PEAK_MAX);

        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                let (col, row) = (centre_col + dc, centre_row + dr);
                if col < 0 || row < 0 {
                    continue;
                }
                let (col, row) = (col as usize, row as usize);
                let Some(current) = frame.get(col, row) else {
                    continue;
                };
                let distance = (dr.abs() + dc.abs()) as f32;
                let temperature = peak - distance * BLOB_FALLOFF;
                if temperature > current {
                    frame.set(col, row, temperature);
                }
            }
        }
    }
}

impl<R: Rng + Send> ThermalSensorSource for SimulatedThermalSource<R> {
    fn read_frame(&mut self) -> Result<ThermalFrame> {
        if self.failure_probability > 0.0 && self.rng.gen_bool(self.failure_probability) {
            return Err(PayloadError::SensorUnavailable(
                "simulated frame read failure".to_string(),
            ));
        }

        let mut frame = ThermalFrame::filled(BACKGROUND_MIN);
        for row in 0..FRAME_HEIGHT {
            for col in 0..FRAME_WIDTH {
                let ambient = self.rng.gen_range(BACKGROUND_MIN..BACKGROUND_MAX);
                frame.set(col, row, ambient);
            }
        }

        let blobs = if self.max_blobs == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.max_blobs)
        };
        for _ in 0..blobs {
            self.add_blob(&mut frame);
        }

        debug!("Simulated thermal frame with {} blobs", blobs);
        Ok(frame)
    }
}
