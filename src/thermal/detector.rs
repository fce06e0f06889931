//! # Hot-Spot Detector
//!
//! Reduces a [`ThermalFrame`] to the `k` hottest pixels inside a temperature
//! window, without sorting the whole grid and without heap allocation.
//!
//! ## Algorithm
//!
//! Pixels are visited in row-major order. Qualifying pixels fill a candidate
//! buffer of `k` slots until it is full. After that each qualifying pixel is
//! compared with the coldest candidate and replaces it only when strictly
//! hotter, so an earlier pixel is never evicted by a later one of equal
//! temperature. The occupied candidates are then sorted hottest first and
//! only their coordinates are published.
//!
//! Worst case is `768 * k` comparisons (24 576 at the 32-slot capacity).
//!
//! ## Usage
//!
//! ```
//! use cansat_payload::thermal::detector::HotSpotDetector;
//! use cansat_payload::thermal::frame::{HotSpot, ThermalFrame};
//!
//! let mut frame = ThermalFrame::filled(10.0);
//! frame.set(4, 2, 99.0);
//! frame.set(7, 9, 98.0);
//!
//! let mut detector = HotSpotDetector::new(50.0, 100.0, 1);
//! assert_eq!(detector.scan(&frame), &[HotSpot::new(4, 2)]);
//! ```

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::frame::{HotSpot, ThermalFrame};
use super::source::ThermalSensorSource;
use crate::error::{PayloadError, Result};

/// Maximum number of hot spots the detector can track
pub const DETECTOR_CAPACITY: usize = 32;

/// Default number of hot spots kept per scan
pub const DEFAULT_MAX_SPOTS: usize = 3;

/// Inclusive temperature window for qualifying pixels (°C)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    pub min_temp: f32,
    pub max_temp: f32,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            min_temp: 0.0,
            max_temp: 100.0,
        }
    }
}

impl TemperatureRange {
    pub fn new(min_temp: f32, max_temp: f32) -> Self {
        Self { min_temp, max_temp }
    }

    /// Whether `temperature` lies inside the window (NaN never does)
    pub fn contains(&self, temperature: f32) -> bool {
        temperature >= self.min_temp && temperature <= self.max_temp
    }
}

/// Candidate pixel held during a scan
#[derive(Debug, Clone, Copy, Default)]
struct Candidate {
    temperature: f32,
    index: usize,
}

/// Streaming top-k hot-spot detector
///
/// Holds the hot-spot list published by the last successful scan. A failed
/// sensor read never touches it.
#[derive(Debug, Clone)]
pub struct HotSpotDetector {
    range: TemperatureRange,
    max_spots: usize,
    found: [HotSpot; DETECTOR_CAPACITY],
    found_count: usize,
}

impl Default for HotSpotDetector {
    fn default() -> Self {
        Self {
            range: TemperatureRange::default(),
            max_spots: DEFAULT_MAX_SPOTS,
            found: [HotSpot::default(); DETECTOR_CAPACITY],
            found_count: 0,
        }
    }
}

impl HotSpotDetector {
    /// Create a detector for the window `[min_temp, max_temp]` keeping
    /// `max_spots` hot spots (clamped to `1..=DETECTOR_CAPACITY`)
    pub fn new(min_temp: f32, max_temp: f32, max_spots: usize) -> Self {
        let mut detector = Self::default();
        detector.set_temperature_range(min_temp, max_temp);
        detector.set_max_spots(max_spots);
        detector
    }

    pub fn set_temperature_range(&mut self, min_temp: f32, max_temp: f32) {
        self.range = TemperatureRange::new(min_temp, max_temp);
    }

    pub fn temperature_range(&self) -> TemperatureRange {
        self.range
    }

    /// Set how many hot spots are kept per scan
    ///
    /// Requests outside `1..=DETECTOR_CAPACITY` are clamped silently.
    pub fn set_max_spots(&mut self, max_spots: usize) {
        let clamped = max_spots.clamp(1, DETECTOR_CAPACITY);
        if clamped != max_spots {
            debug!("Requested {} hot spots, clamped to {}", max_spots, clamped);
        }
        self.max_spots = clamped;
    }

    pub fn max_spots(&self) -> usize {
        self.max_spots
    }

    /// Read a frame from `source` and publish its hot spots
    ///
    /// # Returns
    ///
    /// Number of hot spots found in this frame.
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` if the frame could not be read. The
    /// previously published hot spots are left exactly as they were.
    pub fn detect(&mut self, source: &mut dyn ThermalSensorSource) -> Result<usize> {
        let frame = source.read_frame().map_err(|e| {
            warn!("Thermal frame read failed, keeping previous hot spots: {}", e);
            match e {
                PayloadError::SensorUnavailable(_) => e,
                other => PayloadError::SensorUnavailable(other.to_string()),
            }
        })?;

        Ok(self.scan(&frame).len())
    }

    /// Scan a frame and publish its hot spots, hottest first
    pub fn scan(&mut self, frame: &ThermalFrame) -> &[HotSpot] {
        let mut best = [Candidate::default(); DETECTOR_CAPACITY];
        let mut count = 0;

        for (index, &temperature) in frame.pixels().iter().enumerate() {
            if !self.range.contains(temperature) {
                continue;
            }

            if count < self.max_spots {
                best[count] = Candidate { temperature, index };
                count += 1;
                continue;
            }

            let coldest = coldest_candidate(&best[..count]);
            if temperature > best[coldest].temperature {
                best[coldest] = Candidate { temperature, index };
            }
        }

        let occupied = &mut best[..count];
        occupied.sort_by(|a, b| {
            b.temperature
                .partial_cmp(&a.temperature)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });

        for (slot, candidate) in self.found.iter_mut().zip(occupied.iter()) {
            *slot = HotSpot::from_index(candidate.index);
        }
        self.found_count = count;

        debug!("Hot-spot scan found {} of {} requested", count, self.max_spots);
        self.hot_spots()
    }

    /// Number of hot spots published by the last successful scan
    pub fn found_count(&self) -> usize {
        self.found_count
    }

    /// Hot spots published by the last successful scan, hottest first
    pub fn hot_spots(&self) -> &[HotSpot] {
        &self.found[..self.found_count]
    }

    /// Get the i-th hot spot of the last successful scan
    ///
    /// # Errors
    ///
    /// Returns `HotSpotOutOfRange` if `index >= found_count()`.
    pub fn hot_spot(&self, index: usize) -> Result<HotSpot> {
        self.hot_spots()
            .get(index)
            .copied()
            .ok_or(PayloadError::HotSpotOutOfRange {
                index,
                count: self.found_count,
            })
    }
}

/// Position of the coldest candidate
///
/// Among equally cold candidates the most recently scanned one is chosen, so
/// eviction never favours a later pixel over an earlier one.
fn coldest_candidate(candidates: &[Candidate]) -> usize {
    let mut coldest = 0;
    for (position, candidate) in candidates.iter().enumerate().skip(1) {
        let current = &candidates[coldest];
        if candidate.temperature < current.temperature
            || (candidate.temperature == current.temperature && candidate.index > current.index)
        {
            coldest = position;
        }
    }
    coldest
}
