//! # Thermal Module
//!
//! Thermal camera frames and hot-spot detection.
//!
//! This module handles:
//! - The fixed 32x24 temperature grid captured each detection cycle
//! - Streaming top-k selection of the hottest in-window pixels
//! - The sensor capability interface and its simulated variant

pub mod frame;
pub mod detector;
pub mod source;
