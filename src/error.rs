//! # Error Types
//!
//! Custom error types for the payload firmware using `thiserror`.

use thiserror::Error;

/// Main error type for the payload firmware
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Thermal frame could not be read from the sensor
    #[error("Thermal sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Pixel buffer does not match the 32x24 grid
    #[error("Thermal frame must contain {expected} pixels, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// Hot spot index outside the last successful scan
    #[error("Hot spot index {index} out of range (found {count})")]
    HotSpotOutOfRange { index: usize, count: usize },

    /// Telemetry frame failed delimiter or field-count validation
    #[error("Malformed telemetry frame: {0}")]
    MalformedFrame(String),

    /// Radio send/receive failure
    #[error("Radio transport error: {0}")]
    Transport(String),

    /// No radio serial device could be opened
    #[error("Radio serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the payload firmware
pub type Result<T> = std::result::Result<T, PayloadError>;
