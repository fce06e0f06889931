//! # Synthetic Snapshot Generator
//!
//! Produces plausible randomized snapshots for bench runs and ground-station
//! testing without live hardware. Randomness is injected so runs can be
//! reproduced from a seed.
//!
//! Coordinates are confined to a small box around Korydallos, Attica
//! (37.93–37.95 N, 23.68–23.72 E).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::snapshot::{GeoPoint, TelemetrySnapshot};

const ALTITUDE_RANGE: (f64, f64) = (100.0, 1000.0);
const TEMPERATURE_RANGE: (f64, f64) = (20.0, 35.0);
const PRESSURE_RANGE: (f64, f64) = (950.0, 1020.0);
const LATITUDE_RANGE: (f64, f64) = (37.93, 37.95);
const LONGITUDE_RANGE: (f64, f64) = (23.68, 23.72);
const PITCH_RANGE: (f64, f64) = (0.0, 20.0);
const ROLL_RANGE: (f64, f64) = (0.0, 15.0);
const YAW_RANGE: (f64, f64) = (0.0, 10.0);

/// Probability that the video transmitter is reported on
const VTX_ON_PROBABILITY: f64 = 0.9;

/// Hot spots per snapshot (inclusive)
const HOT_SPOT_COUNT: (usize, usize) = (1, 3);

/// Maximum hot-spot offset from the vehicle position, in degrees
const HOT_SPOT_JITTER_DEG: f64 = 0.001;

/// Randomized [`TelemetrySnapshot`] source
///
/// # Examples
///
/// ```
/// use cansat_payload::telemetry::generator::SyntheticSnapshotGenerator;
///
/// let mut a = SyntheticSnapshotGenerator::from_seed(7);
/// let mut b = SyntheticSnapshotGenerator::from_seed(7);
/// assert_eq!(a.generate(1.0), b.generate(1.0));
/// ```
pub struct SyntheticSnapshotGenerator<R: Rng> {
    rng: R,
}

impl SyntheticSnapshotGenerator<StdRng> {
    /// Generator backed by a seeded `StdRng`
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SyntheticSnapshotGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generate one snapshot stamped with `timestamp` (seconds)
    ///
    /// The timestamp comes from the caller's clock; the generator never
    /// reads time itself.
    pub fn generate(&mut self, timestamp: f64) -> TelemetrySnapshot {
        let latitude = round_to(self.uniform(LATITUDE_RANGE), 4);
        let longitude = round_to(self.uniform(LONGITUDE_RANGE), 4);

        let count = self.rng.gen_range(HOT_SPOT_COUNT.0..=HOT_SPOT_COUNT.1);
        let hot_spots = (0..count)
            .map(|_| {
                let lat = latitude + self.rng.gen_range(-HOT_SPOT_JITTER_DEG..=HOT_SPOT_JITTER_DEG);
                let lng = longitude + self.rng.gen_range(-HOT_SPOT_JITTER_DEG..=HOT_SPOT_JITTER_DEG);
                GeoPoint::new(round_to(lat, 4), round_to(lng, 4))
            })
            .collect();

        TelemetrySnapshot {
            altitude: round_to(self.uniform(ALTITUDE_RANGE), 1),
            temperature: round_to(self.uniform(TEMPERATURE_RANGE), 1),
            pressure: round_to(self.uniform(PRESSURE_RANGE), 1),
            gps_time: self.gps_time(),
            latitude,
            longitude,
            pitch: round_to(self.uniform(PITCH_RANGE), 1),
            roll: round_to(self.uniform(ROLL_RANGE), 1),
            yaw: round_to(self.uniform(YAW_RANGE), 1),
            vtx_on: self.rng.gen_bool(VTX_ON_PROBABILITY),
            hot_spots,
            timestamp,
        }
    }

    fn uniform(&mut self, (low, high): (f64, f64)) -> f64 {
        self.rng.gen_range(low..=high)
    }

    fn gps_time(&mut self) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            self.rng.gen_range(0..24),
            self.rng.gen_range(0..60),
            self.rng.gen_range(0..60)
        )
    }
}

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::codec;

    fn within(value: f64, (low, high): (f64, f64)) -> bool {
        value >= low && value <= high
    }

    #[test]
    fn test_fields_within_ranges() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(11);
        for _ in 0..200 {
            let s = generator.generate(0.0);
            assert!(within(s.altitude, ALTITUDE_RANGE));
            assert!(within(s.temperature, TEMPERATURE_RANGE));
            assert!(within(s.pressure, PRESSURE_RANGE));
            assert!(within(s.latitude, LATITUDE_RANGE));
            assert!(within(s.longitude, LONGITUDE_RANGE));
            assert!(within(s.pitch, PITCH_RANGE));
            assert!(within(s.roll, ROLL_RANGE));
            assert!(within(s.yaw, YAW_RANGE));
            assert!((1..=3).contains(&s.hot_spots.len()));
        }
    }

    #[test]
    fn test_hot_spots_near_base_coordinate() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(5);
        for _ in 0..100 {
            let s = generator.generate(0.0);
            for spot in &s.hot_spots {
                // jitter plus rounding slack
                assert!((spot.latitude - s.latitude).abs() <= 0.0011);
                assert!((spot.longitude - s.longitude).abs() <= 0.0011);
            }
        }
    }

    #[test]
    fn test_gps_time_format() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(2);
        for _ in 0..50 {
            let time = generator.generate(0.0).gps_time;
            let parts: Vec<u32> = time.split(':').map(|p| p.parse().unwrap()).collect();
            assert_eq!(time.len(), 8);
            assert_eq!(parts.len(), 3);
            assert!(parts[0] < 24 && parts[1] < 60 && parts[2] < 60);
        }
    }

    #[test]
    fn test_vtx_mostly_on() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(99);
        let on = (0..2000).filter(|_| generator.generate(0.0).vtx_on).count();
        let ratio = on as f64 / 2000.0;
        assert!((0.85..=0.95).contains(&ratio), "vtx on ratio {}", ratio);
    }

    #[test]
    fn test_timestamp_comes_from_caller() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(1);
        assert_eq!(generator.generate(1_700_000_000.125).timestamp, 1_700_000_000.125);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = SyntheticSnapshotGenerator::from_seed(1).generate(0.0);
        let b = SyntheticSnapshotGenerator::from_seed(2).generate(0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_snapshots_survive_the_wire_exactly() {
        let mut generator = SyntheticSnapshotGenerator::from_seed(21);
        for i in 0..100 {
            let snapshot = generator.generate(i as f64 * 0.5);
            let decoded = codec::decode(&codec::encode(&snapshot)).unwrap();
            assert_eq!(decoded, snapshot);
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(37.94444, 4), 37.9444);
        assert_eq!(round_to(0.05, 1), 0.1);
        assert_eq!(round_to(-0.05, 1), -0.1);
    }
}
