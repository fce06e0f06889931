//! # Telemetry Snapshot
//!
//! Flight-state record assembled once per telemetry cycle and carried over
//! the radio link in the text format of [`super::codec`].

use serde::{Deserialize, Serialize};

use super::codec;
use crate::error::Result;

/// Geographic hot-spot position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One complete flight-state record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Altitude in meters
    pub altitude: f64,

    /// Air temperature in °C
    pub temperature: f64,

    /// Pressure in hPa
    pub pressure: f64,

    /// GPS time as reported, "HH:MM:SS" (not parsed)
    pub gps_time: String,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Pitch in degrees
    pub pitch: f64,

    /// Roll in degrees
    pub roll: f64,

    /// Yaw in degrees
    pub yaw: f64,

    /// Video transmitter powered (wire value 1/0)
    pub vtx_on: bool,

    /// Geographic hot spots, hottest first
    pub hot_spots: Vec<GeoPoint>,

    /// Capture time in seconds
    pub timestamp: f64,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            altitude: 0.0,
            temperature: 0.0,
            pressure: 0.0,
            gps_time: "00:00:00".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            vtx_on: false,
            hot_spots: Vec::new(),
            timestamp: 0.0,
        }
    }
}

impl TelemetrySnapshot {
    /// Encode into a `#...#` wire frame
    pub fn to_frame(&self) -> String {
        codec::encode(self)
    }

    /// Replace this snapshot with the one decoded from `frame`
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if the frame fails validation, in which case
    /// `self` is left unmodified.
    ///
    /// # Examples
    ///
    /// ```
    /// use cansat_payload::telemetry::snapshot::TelemetrySnapshot;
    ///
    /// let mut snapshot = TelemetrySnapshot::default();
    /// assert!(snapshot.update_from_frame("no delimiters").is_err());
    /// assert_eq!(snapshot, TelemetrySnapshot::default());
    /// ```
    pub fn update_from_frame(&mut self, frame: &str) -> Result<()> {
        *self = codec::decode(frame)?;
        Ok(())
    }
}

impl std::fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "alt {:.1} m, {:.1} °C, {:.1} hPa, gps {} @ ({:.4}, {:.4}), \
             pitch {:.1} roll {:.1} yaw {:.1}, vtx {}, {} hot spots, t={:.3}",
            self.altitude,
            self.temperature,
            self.pressure,
            self.gps_time,
            self.latitude,
            self.longitude,
            self.pitch,
            self.roll,
            self.yaw,
            if self.vtx_on { "on" } else { "off" },
            self.hot_spots.len(),
            self.timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.gps_time, "00:00:00");
        assert!(!snapshot.vtx_on);
        assert!(snapshot.hot_spots.is_empty());
        assert_eq!(snapshot.timestamp, 0.0);
    }

    #[test]
    fn test_update_from_frame_replaces_wholesale() {
        let mut snapshot = TelemetrySnapshot {
            hot_spots: vec![GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)],
            timestamp: 99.0,
            ..TelemetrySnapshot::default()
        };

        snapshot
            .update_from_frame("#10.0,20.0,1000.0,01:02:03,37.0,23.0,0.0,0.0,0.0,1#")
            .unwrap();

        assert_eq!(snapshot.altitude, 10.0);
        assert_eq!(snapshot.gps_time, "01:02:03");
        assert!(snapshot.vtx_on);
        assert!(snapshot.hot_spots.is_empty());
        assert_eq!(snapshot.timestamp, 0.0);
    }

    #[test]
    fn test_update_from_bad_frame_leaves_snapshot_untouched() {
        let original = TelemetrySnapshot {
            altitude: 512.3,
            gps_time: "11:11:11".to_string(),
            hot_spots: vec![GeoPoint::new(37.94, 23.7)],
            ..TelemetrySnapshot::default()
        };
        let mut snapshot = original.clone();

        for bad in ["1,2,3,4,5,6,7,8,9,10#", "#1,2,3,4,5,6,7,8,9,10", "#1,2,3#"] {
            assert!(snapshot.update_from_frame(bad).is_err());
            assert_eq!(snapshot, original);
        }
    }

    #[test]
    fn test_display_summary() {
        let snapshot = TelemetrySnapshot {
            vtx_on: true,
            hot_spots: vec![GeoPoint::new(37.98, 23.70)],
            ..TelemetrySnapshot::default()
        };
        let text = snapshot.to_string();
        assert!(text.contains("vtx on"));
        assert!(text.contains("1 hot spots"));
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = TelemetrySnapshot {
            hot_spots: vec![GeoPoint::new(37.98, 23.70)],
            ..TelemetrySnapshot::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
