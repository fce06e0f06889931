//! # Telemetry Module
//!
//! Flight-state snapshots and their radio wire format.
//!
//! This module handles:
//! - The snapshot data model sent once per telemetry cycle
//! - Encoding/decoding the `#`-delimited text frame
//! - Generating synthetic snapshots for bench runs
//! - Persisting frames and received snapshots to rotating log files

pub mod snapshot;
pub mod codec;
pub mod generator;
pub mod log;
