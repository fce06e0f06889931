//! # CanSat Payload Library
//!
//! Flight payload firmware for a CanSat carrying a 32x24 thermal camera.
//!
//! This library provides the core functionality for finding the hottest
//! pixels in each thermal frame, projecting them onto the ground and sending
//! them to a ground station in a compact `#`-delimited text frame.

pub mod config;
pub mod error;
pub mod flight;
pub mod geo;
pub mod ground;
pub mod radio;
pub mod telemetry;
pub mod thermal;
