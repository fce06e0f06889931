//! # Telemetry Frame Codec
//!
//! Text framing for [`TelemetrySnapshot`] over the low-bandwidth radio link.
//!
//! ## Wire Format
//!
//! ```text
//! #altitude,temperature,pressure,gps_time,latitude,longitude,pitch,roll,yaw,vtx[,hs_lat,hs_lng]*[,timestamp]#
//! ```
//!
//! | Field | Precision |
//! |-------|-----------|
//! | altitude, temperature, pressure | 1 dp |
//! | gps_time | verbatim |
//! | latitude, longitude | 4 dp |
//! | pitch, roll, yaw | 1 dp |
//! | vtx | `0` or `1` |
//! | hot-spot latitude/longitude pairs | 4 dp |
//! | timestamp | 3 dp |
//!
//! There is no checksum or length prefix. Corruption is only caught by the
//! delimiter and field-count checks.
//!
//! ## Trailing Section
//!
//! Everything after the 10 fixed fields is the trailing section. An odd
//! field count means the last field is the timestamp; an even count means
//! there is no timestamp (decoded as 0) and every field belongs to a hot-spot
//! pair. A frame carrying hot spots but no timestamp is therefore
//! indistinguishable from one whose last value is meant as a timestamp. This
//! ambiguity is part of the protocol and receivers rely on it.

use super::snapshot::{GeoPoint, TelemetrySnapshot};
use crate::error::{PayloadError, Result};

/// Frame start/end delimiter
pub const FRAME_DELIMITER: char = '#';

/// Field separator
pub const FIELD_SEPARATOR: char = ',';

/// Number of positional fields before the trailing section
pub const FIXED_FIELD_COUNT: usize = 10;

/// Decimals for altitude, temperature, pressure and attitude angles
pub const SCALAR_PRECISION: usize = 1;

/// Decimals for vehicle and hot-spot coordinates
pub const COORDINATE_PRECISION: usize = 4;

/// Decimals for the timestamp
pub const TIMESTAMP_PRECISION: usize = 3;

/// Encode a snapshot into a complete `#...#` frame
///
/// Encoding never fails. The timestamp is always written as the last field.
///
/// # Examples
///
/// ```
/// use cansat_payload::telemetry::codec::encode;
/// use cansat_payload::telemetry::snapshot::TelemetrySnapshot;
///
/// let frame = encode(&TelemetrySnapshot::default());
/// assert_eq!(frame, "#0.0,0.0,0.0,00:00:00,0.0000,0.0000,0.0,0.0,0.0,0,0.000#");
/// ```
pub fn encode(snapshot: &TelemetrySnapshot) -> String {
    let mut fields = Vec::with_capacity(FIXED_FIELD_COUNT + 2 * snapshot.hot_spots.len() + 1);

    fields.push(format_fixed(snapshot.altitude, SCALAR_PRECISION));
    fields.push(format_fixed(snapshot.temperature, SCALAR_PRECISION));
    fields.push(format_fixed(snapshot.pressure, SCALAR_PRECISION));
    fields.push(snapshot.gps_time.clone());
    fields.push(format_fixed(snapshot.latitude, COORDINATE_PRECISION));
    fields.push(format_fixed(snapshot.longitude, COORDINATE_PRECISION));
    fields.push(format_fixed(snapshot.pitch, SCALAR_PRECISION));
    fields.push(format_fixed(snapshot.roll, SCALAR_PRECISION));
    fields.push(format_fixed(snapshot.yaw, SCALAR_PRECISION));
    fields.push(if snapshot.vtx_on { "1" } else { "0" }.to_string());

    for spot in &snapshot.hot_spots {
        fields.push(format_fixed(spot.latitude, COORDINATE_PRECISION));
        fields.push(format_fixed(spot.longitude, COORDINATE_PRECISION));
    }

    fields.push(format_fixed(snapshot.timestamp, TIMESTAMP_PRECISION));

    let separator = FIELD_SEPARATOR.to_string();
    format!(
        "{delim}{}{delim}",
        fields.join(separator.as_str()),
        delim = FRAME_DELIMITER
    )
}

/// Decode a `#...#` frame into a new snapshot
///
/// Numeric fields that fail to parse decode as 0 rather than rejecting the
/// frame.
///
/// # Errors
///
/// Returns `MalformedFrame` if, after trimming whitespace, the frame does not
/// both start and end with `#`, or carries fewer than 10 fields.
pub fn decode(frame: &str) -> Result<TelemetrySnapshot> {
    let trimmed = frame.trim();
    if trimmed.len() < 2
        || !trimmed.starts_with(FRAME_DELIMITER)
        || !trimmed.ends_with(FRAME_DELIMITER)
    {
        return Err(PayloadError::MalformedFrame(
            "missing '#' delimiters".to_string(),
        ));
    }

    let body = trimmed[1..trimmed.len() - 1].trim();
    let fields: Vec<&str> = body.split(FIELD_SEPARATOR).map(str::trim).collect();

    if fields.len() < FIXED_FIELD_COUNT {
        return Err(PayloadError::MalformedFrame(format!(
            "expected at least {} fields, got {}",
            FIXED_FIELD_COUNT,
            fields.len()
        )));
    }

    let trailing = &fields[FIXED_FIELD_COUNT..];
    let (pairs, timestamp) = match trailing.split_last() {
        Some((last, rest)) if trailing.len() % 2 == 1 => (rest, parse_number(last)),
        _ => (trailing, 0.0),
    };

    // chunks_exact drops an unpaired leftover field
    let hot_spots = pairs
        .chunks_exact(2)
        .map(|pair| GeoPoint::new(parse_number(pair[0]), parse_number(pair[1])))
        .collect();

    Ok(TelemetrySnapshot {
        altitude: parse_number(fields[0]),
        temperature: parse_number(fields[1]),
        pressure: parse_number(fields[2]),
        gps_time: fields[3].to_string(),
        latitude: parse_number(fields[4]),
        longitude: parse_number(fields[5]),
        pitch: parse_number(fields[6]),
        roll: parse_number(fields[7]),
        yaw: parse_number(fields[8]),
        vtx_on: parse_flag(fields[9]),
        hot_spots,
        timestamp,
    })
}

/// Format `value` with exactly `decimals` digits, rounding half away from zero
///
/// # Examples
///
/// ```
/// use cansat_payload::telemetry::codec::format_fixed;
///
/// assert_eq!(format_fixed(123.45, 1), "123.5");
/// assert_eq!(format_fixed(-2.25, 1), "-2.3");
/// assert_eq!(format_fixed(37.98, 4), "37.9800");
/// ```
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    // Avoid emitting "-0.0" for values that round to zero
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", decimals, rounded)
}

/// Parse a numeric field; anything unparseable or non-finite reads as 0
fn parse_number(field: &str) -> f64 {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_flag(field: &str) -> bool {
    field.parse::<i64>().map(|v| v != 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_FRAME: &str =
        "#123.5,22.7,1005.3,12:34:56,37.9788,23.7009,1.2,0.5,3.4,1,37.9800,23.7020,42.123#";

    fn reference_snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            altitude: 123.45,
            temperature: 22.7,
            pressure: 1005.3,
            gps_time: "12:34:56".to_string(),
            latitude: 37.9788,
            longitude: 23.7009,
            pitch: 1.2,
            roll: 0.5,
            yaw: 3.4,
            vtx_on: true,
            hot_spots: vec![GeoPoint::new(37.9800, 23.7020)],
            timestamp: 42.123,
        }
    }

    fn snapshot_with_spots(count: usize) -> TelemetrySnapshot {
        TelemetrySnapshot {
            hot_spots: (0..count)
                .map(|i| GeoPoint::new(37.94 + i as f64 * 0.0001, 23.70 - i as f64 * 0.0002))
                .collect(),
            ..reference_snapshot()
        }
    }

    fn assert_close(a: f64, b: f64, decimals: usize) {
        let tolerance = 0.5 * 10f64.powi(-(decimals as i32)) + 1e-9;
        assert!((a - b).abs() <= tolerance, "{} vs {} at {} dp", a, b, decimals);
    }

    #[test]
    fn test_encode_reference_frame() {
        assert_eq!(encode(&reference_snapshot()), REFERENCE_FRAME);
    }

    #[test]
    fn test_decode_reference_frame() {
        let decoded = decode(REFERENCE_FRAME).unwrap();

        assert_eq!(decoded.altitude, 123.5);
        assert_eq!(decoded.temperature, 22.7);
        assert_eq!(decoded.pressure, 1005.3);
        assert_eq!(decoded.gps_time, "12:34:56");
        assert_eq!(decoded.latitude, 37.9788);
        assert_eq!(decoded.longitude, 23.7009);
        assert_eq!(decoded.pitch, 1.2);
        assert_eq!(decoded.roll, 0.5);
        assert_eq!(decoded.yaw, 3.4);
        assert!(decoded.vtx_on);
        assert_eq!(decoded.hot_spots, vec![GeoPoint::new(37.98, 23.702)]);
        assert_eq!(decoded.timestamp, 42.123);
    }

    #[test]
    fn test_round_trip_with_zero_to_three_hot_spots() {
        for count in 0..=3 {
            let original = snapshot_with_spots(count);
            let decoded = decode(&encode(&original)).unwrap();

            assert_eq!(decoded.hot_spots.len(), count);
            assert_close(decoded.altitude, original.altitude, SCALAR_PRECISION);
            assert_close(decoded.latitude, original.latitude, COORDINATE_PRECISION);
            assert_close(decoded.timestamp, original.timestamp, TIMESTAMP_PRECISION);
            for (d, o) in decoded.hot_spots.iter().zip(&original.hot_spots) {
                assert_close(d.latitude, o.latitude, COORDINATE_PRECISION);
                assert_close(d.longitude, o.longitude, COORDINATE_PRECISION);
            }
        }
    }

    #[test]
    fn test_reencoding_is_byte_identical() {
        for count in 0..=3 {
            let first = encode(&snapshot_with_spots(count));
            let second = encode(&decode(&first).unwrap());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_even_trailing_count_has_no_timestamp() {
        let frame = "#100.0,20.0,1000.0,10:00:00,37.9400,23.7000,0.0,0.0,0.0,1,37.9401,23.7001,37.9402,23.7002#";
        let decoded = decode(frame).unwrap();

        assert_eq!(decoded.timestamp, 0.0);
        assert_eq!(
            decoded.hot_spots,
            vec![GeoPoint::new(37.9401, 23.7001), GeoPoint::new(37.9402, 23.7002)]
        );
    }

    #[test]
    fn test_odd_trailing_count_takes_last_as_timestamp() {
        let frame = "#100.0,20.0,1000.0,10:00:00,37.9400,23.7000,0.0,0.0,0.0,1,37.9401,23.7001,37.9402,23.7002,17.250#";
        let decoded = decode(frame).unwrap();

        assert_eq!(decoded.timestamp, 17.25);
        assert_eq!(decoded.hot_spots.len(), 2);
    }

    #[test]
    fn test_extra_field_is_reinterpreted_as_timestamp() {
        // One pair plus a stray value: the stray value becomes the timestamp
        let frame = "#100.0,20.0,1000.0,10:00:00,37.9400,23.7000,0.0,0.0,0.0,0,37.9401,23.7001,37.9999#";
        let decoded = decode(frame).unwrap();

        assert_eq!(decoded.hot_spots, vec![GeoPoint::new(37.9401, 23.7001)]);
        assert_eq!(decoded.timestamp, 37.9999);
    }

    #[test]
    fn test_exactly_ten_fields() {
        let decoded = decode("#1.0,2.0,3.0,00:00:01,4.0,5.0,6.0,7.0,8.0,0#").unwrap();
        assert!(decoded.hot_spots.is_empty());
        assert_eq!(decoded.timestamp, 0.0);
        assert_eq!(decoded.yaw, 8.0);
        assert!(!decoded.vtx_on);
    }

    #[test]
    fn test_timestamp_only_trailing_section() {
        let decoded = decode("#1.0,2.0,3.0,00:00:01,4.0,5.0,6.0,7.0,8.0,1,99.5#").unwrap();
        assert!(decoded.hot_spots.is_empty());
        assert_eq!(decoded.timestamp, 99.5);
    }

    #[test]
    fn test_decode_rejects_missing_leading_delimiter() {
        let frame = &REFERENCE_FRAME[1..];
        assert!(matches!(decode(frame), Err(PayloadError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_rejects_missing_trailing_delimiter() {
        let frame = &REFERENCE_FRAME[..REFERENCE_FRAME.len() - 1];
        assert!(matches!(decode(frame), Err(PayloadError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_rejects_too_few_fields() {
        match decode("#1.0,2.0,3.0,00:00:01,4.0,5.0,6.0,7.0,8.0#") {
            Err(PayloadError::MalformedFrame(msg)) => assert!(msg.contains("got 9")),
            other => panic!("Expected MalformedFrame, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_lone_delimiter_and_empty() {
        assert!(decode("#").is_err());
        assert!(decode("##").is_err());
        assert!(decode("").is_err());
        assert!(decode("   ").is_err());
    }

    #[test]
    fn test_decode_trims_surrounding_whitespace() {
        let padded = format!("  \r\n{}\n", REFERENCE_FRAME);
        assert_eq!(decode(&padded).unwrap(), decode(REFERENCE_FRAME).unwrap());

        let inner = "# 1.0 , 2.0,3.0, 12:00:00 ,4.0,5.0,6.0,7.0,8.0, 1 , 5.5 #";
        let decoded = decode(inner).unwrap();
        assert_eq!(decoded.altitude, 1.0);
        assert_eq!(decoded.gps_time, "12:00:00");
        assert!(decoded.vtx_on);
        assert_eq!(decoded.timestamp, 5.5);
    }

    #[test]
    fn test_unparseable_numbers_decode_as_zero() {
        let decoded = decode("#abc,2.0,,00:00:01,x,5.0,6.0,7.0,8.0,yes,1.0,oops,ts#").unwrap();

        assert_eq!(decoded.altitude, 0.0);
        assert_eq!(decoded.pressure, 0.0);
        assert_eq!(decoded.latitude, 0.0);
        assert_eq!(decoded.longitude, 5.0);
        assert!(!decoded.vtx_on);
        assert_eq!(decoded.hot_spots, vec![GeoPoint::new(1.0, 0.0)]);
        assert_eq!(decoded.timestamp, 0.0);
    }

    #[test]
    fn test_non_finite_numbers_decode_as_zero() {
        let decoded =
            decode("#nan,inf,-inf,12:00:00,infinity,NaN,1.5,-Infinity,0.0,1,inf,nan,NaN#")
                .unwrap();

        assert_eq!(decoded.altitude, 0.0);
        assert_eq!(decoded.temperature, 0.0);
        assert_eq!(decoded.pressure, 0.0);
        assert_eq!(decoded.latitude, 0.0);
        assert_eq!(decoded.longitude, 0.0);
        assert_eq!(decoded.pitch, 1.5);
        assert_eq!(decoded.roll, 0.0);
        assert_eq!(decoded.hot_spots, vec![GeoPoint::new(0.0, 0.0)]);
        assert_eq!(decoded.timestamp, 0.0);

        assert_eq!(decode(&encode(&decoded)).unwrap(), decoded);
    }

    #[test]
    fn test_format_fixed_rounds_half_away_from_zero() {
        assert_eq!(format_fixed(0.25, 1), "0.3");
        assert_eq!(format_fixed(-0.25, 1), "-0.3");
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(0.0625, 3), "0.063");
    }

    #[test]
    fn test_format_fixed_never_emits_negative_zero() {
        assert_eq!(format_fixed(-0.04, 1), "0.0");
        assert_eq!(format_fixed(-0.0, 4), "0.0000");
    }

    #[test]
    fn test_format_fixed_pads_decimals() {
        assert_eq!(format_fixed(1005.3, 1), "1005.3");
        assert_eq!(format_fixed(37.98, 4), "37.9800");
        assert_eq!(format_fixed(42.0, 3), "42.000");
    }

    #[test]
    fn test_gps_time_passed_verbatim() {
        let snapshot = TelemetrySnapshot {
            gps_time: "23:59:60".to_string(),
            ..TelemetrySnapshot::default()
        };
        let frame = encode(&snapshot);
        assert!(frame.contains(",23:59:60,"));
        assert_eq!(decode(&frame).unwrap().gps_time, "23:59:60");
    }
}
