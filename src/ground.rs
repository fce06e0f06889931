//! # Ground Station
//!
//! Receives telemetry frames, keeps the latest decoded snapshot and archives
//! every accepted snapshot as one JSON line:
//!
//! ```text
//! {"received_at":"2024-05-01T10:15:30.123Z","rssi":-71,"snapshot":{...}}
//! ```

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::radio::RadioTransport;
use crate::telemetry::log::PersistentLog;
use crate::telemetry::snapshot::TelemetrySnapshot;

/// Result of one [`GroundStation::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was received
    Idle,
    /// A frame was decoded into the latest snapshot
    Updated,
    /// A frame arrived but failed validation; the latest snapshot is unchanged
    Malformed,
}

#[derive(Serialize)]
struct ReceivedRecord<'a> {
    received_at: String,
    rssi: Option<i32>,
    snapshot: &'a TelemetrySnapshot,
}

/// Receiving end of the telemetry link
pub struct GroundStation {
    radio: Box<dyn RadioTransport>,
    latest: TelemetrySnapshot,
    last_rssi: Option<i32>,
    received: u64,
    malformed: u64,
    log: Option<Box<dyn PersistentLog>>,
}

impl std::fmt::Debug for GroundStation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundStation")
            .field("last_rssi", &self.last_rssi)
            .field("received", &self.received)
            .field("malformed", &self.malformed)
            .finish_non_exhaustive()
    }
}

impl GroundStation {
    pub fn new(radio: Box<dyn RadioTransport>) -> Self {
        Self {
            radio,
            latest: TelemetrySnapshot::default(),
            last_rssi: None,
            received: 0,
            malformed: 0,
            log: None,
        }
    }

    #[must_use]
    pub fn with_log(mut self, log: Box<dyn PersistentLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Most recent successfully decoded snapshot
    pub fn latest(&self) -> &TelemetrySnapshot {
        &self.latest
    }

    /// Signal strength of the last received packet, malformed or not
    pub fn last_rssi(&self) -> Option<i32> {
        self.last_rssi
    }

    /// Frames decoded successfully
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Frames rejected by the decoder
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Receive and process at most one packet
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the radio failed. Malformed frames and log
    /// failures are not errors.
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        let Some(packet) = self.radio.receive().await? else {
            return Ok(PollOutcome::Idle);
        };

        if packet.rssi.is_some() {
            self.last_rssi = packet.rssi;
        }

        if let Err(e) = self.latest.update_from_frame(&packet.message) {
            self.malformed += 1;
            warn!("Dropping telemetry frame: {}", e);
            return Ok(PollOutcome::Malformed);
        }

        self.received += 1;
        debug!("Received snapshot: {}", self.latest);

        if let Some(log) = self.log.as_mut() {
            let record = ReceivedRecord {
                received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                rssi: packet.rssi,
                snapshot: &self.latest,
            };
            let written = serde_json::to_string(&record)
                .map_err(Into::into)
                .and_then(|line| log.append(&line));
            if let Err(e) = written {
                warn!("Failed to log received snapshot: {}", e);
            }
        }

        Ok(PollOutcome::Updated)
    }

    /// Poll until the link reports nothing pending
    ///
    /// # Returns
    ///
    /// Number of snapshots decoded.
    pub async fn drain(&mut self) -> Result<usize> {
        let mut updated = 0;
        loop {
            match self.poll().await? {
                PollOutcome::Idle => return Ok(updated),
                PollOutcome::Updated => updated += 1,
                PollOutcome::Malformed => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;
    use crate::radio::LoopbackRadio;
    use crate::telemetry::log::MockPersistentLog;
    use crate::telemetry::snapshot::GeoPoint;
    use std::sync::{Arc, Mutex};

    const FRAME: &str =
        "#123.5,22.7,1005.3,12:34:56,37.9788,23.7009,1.2,0.5,3.4,1,37.9800,23.7020,42.123#";

    fn capturing_log() -> (MockPersistentLog, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let mut log = MockPersistentLog::new();
        log.expect_append().returning(move |line| {
            sink.lock().unwrap().push(line.to_string());
            Ok(())
        });
        (log, lines)
    }

    #[tokio::test]
    async fn test_poll_idle_when_nothing_received() {
        let mut station = GroundStation::new(Box::new(LoopbackRadio::new(-70)));
        assert_eq!(station.poll().await.unwrap(), PollOutcome::Idle);
        assert_eq!(station.last_rssi(), None);
        assert_eq!(station.latest(), &TelemetrySnapshot::default());
    }

    #[tokio::test]
    async fn test_poll_decodes_frame_and_records_rssi() {
        let mut link = LoopbackRadio::new(-71);
        let mut station = GroundStation::new(Box::new(link.clone()));
        link.send(FRAME).await.unwrap();

        assert_eq!(station.poll().await.unwrap(), PollOutcome::Updated);
        assert_eq!(station.last_rssi(), Some(-71));
        assert_eq!(station.received(), 1);

        let latest = station.latest();
        assert_eq!(latest.altitude, 123.5);
        assert_eq!(latest.gps_time, "12:34:56");
        assert!(latest.vtx_on);
        assert_eq!(latest.hot_spots, vec![GeoPoint::new(37.98, 23.702)]);
        assert_eq!(latest.timestamp, 42.123);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_latest_snapshot() {
        let mut link = LoopbackRadio::new(-80);
        let mut station = GroundStation::new(Box::new(link.clone()));
        link.send(FRAME).await.unwrap();
        link.send("#1,2,3#").await.unwrap();

        station.poll().await.unwrap();
        let before = station.latest().clone();

        assert_eq!(station.poll().await.unwrap(), PollOutcome::Malformed);
        assert_eq!(station.latest(), &before);
        assert_eq!(station.malformed(), 1);
        assert_eq!(station.received(), 1);
        assert_eq!(station.last_rssi(), Some(-80));
    }

    #[tokio::test]
    async fn test_accepted_snapshot_logged_as_json_line() {
        let (log, lines) = capturing_log();
        let mut link = LoopbackRadio::new(-65);
        let mut station = GroundStation::new(Box::new(link.clone())).with_log(Box::new(log));
        link.send(FRAME).await.unwrap();
        link.send("garbage").await.unwrap();

        station.drain().await.unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["rssi"], -65);
        assert_eq!(record["snapshot"]["gps_time"], "12:34:56");
        assert_eq!(record["snapshot"]["hot_spots"][0]["latitude"], 37.98);
        let received_at = record["received_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(received_at).is_ok());
    }

    #[tokio::test]
    async fn test_log_failure_does_not_fail_poll() {
        let mut log = MockPersistentLog::new();
        log.expect_append()
            .returning(|_| Err(PayloadError::Io(std::io::Error::other("read-only"))));
        let mut link = LoopbackRadio::new(-65);
        let mut station = GroundStation::new(Box::new(link.clone())).with_log(Box::new(log));
        link.send(FRAME).await.unwrap();

        assert_eq!(station.poll().await.unwrap(), PollOutcome::Updated);
    }

    #[tokio::test]
    async fn test_drain_counts_only_decoded_frames() {
        let mut link = LoopbackRadio::new(-65);
        let mut station = GroundStation::new(Box::new(link.clone()));
        link.send(FRAME).await.unwrap();
        link.send("#bad#").await.unwrap();
        link.send(FRAME).await.unwrap();

        assert_eq!(station.drain().await.unwrap(), 2);
        assert_eq!(station.malformed(), 1);
        assert_eq!(link.pending(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_from_flight_snapshot() {
        let snapshot = TelemetrySnapshot {
            altitude: 812.3,
            gps_time: "01:02:03".to_string(),
            latitude: 37.9412,
            longitude: 23.7001,
            hot_spots: vec![GeoPoint::new(37.9415, 23.7005)],
            timestamp: 17.25,
            ..Default::default()
        };
        let mut link = LoopbackRadio::new(-60);
        let mut station = GroundStation::new(Box::new(link.clone()));
        link.send(&snapshot.to_frame()).await.unwrap();

        station.poll().await.unwrap();
        assert_eq!(station.latest(), &snapshot);
    }
}
