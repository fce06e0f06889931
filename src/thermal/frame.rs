//! # Thermal Frame Types
//!
//! Fixed-size pixel grid produced by the thermal sensor once per detection
//! cycle, and the grid coordinate emitted for each hot spot.

use crate::error::{PayloadError, Result};

/// Grid width in pixels (columns)
pub const FRAME_WIDTH: usize = 32;

/// Grid height in pixels (rows)
pub const FRAME_HEIGHT: usize = 24;

/// Total number of pixels in one frame
pub const FRAME_PIXELS: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// One captured grid of temperatures in °C, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalFrame {
    pixels: [f32; FRAME_PIXELS],
}

impl ThermalFrame {
    /// Create a frame from a full pixel array
    pub fn new(pixels: [f32; FRAME_PIXELS]) -> Self {
        Self { pixels }
    }

    /// Create a frame with every pixel set to `temperature`
    ///
    /// # Examples
    ///
    /// ```
    /// use cansat_payload::thermal::frame::ThermalFrame;
    ///
    /// let frame = ThermalFrame::filled(21.5);
    /// assert_eq!(frame.get(31, 23), Some(21.5));
    /// ```
    pub fn filled(temperature: f32) -> Self {
        Self {
            pixels: [temperature; FRAME_PIXELS],
        }
    }

    /// Temperature at `(column, row)`, or `None` outside the grid
    pub fn get(&self, column: usize, row: usize) -> Option<f32> {
        if column >= FRAME_WIDTH || row >= FRAME_HEIGHT {
            return None;
        }
        Some(self.pixels[row * FRAME_WIDTH + column])
    }

    /// Overwrite the temperature at `(column, row)`
    ///
    /// Out-of-grid coordinates are ignored. Frames are only mutated while
    /// being built by a sensor source, before detection sees them.
    pub fn set(&mut self, column: usize, row: usize, temperature: f32) {
        if column < FRAME_WIDTH && row < FRAME_HEIGHT {
            self.pixels[row * FRAME_WIDTH + column] = temperature;
        }
    }

    /// Row-major pixel slice
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }
}

impl TryFrom<&[f32]> for ThermalFrame {
    type Error = PayloadError;

    fn try_from(pixels: &[f32]) -> Result<Self> {
        let pixels: [f32; FRAME_PIXELS] =
            pixels.try_into().map_err(|_| PayloadError::FrameSize {
                expected: FRAME_PIXELS,
                actual: pixels.len(),
            })?;
        Ok(Self { pixels })
    }
}

/// Grid coordinate of a detected hot spot
///
/// Carries no temperature once emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HotSpot {
    /// Column, 0..32
    pub column: usize,

    /// Row, 0..24
    pub row: usize,
}

impl HotSpot {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Coordinate of a row-major pixel index
    pub fn from_index(index: usize) -> Self {
        Self {
            column: index % FRAME_WIDTH,
            row: index / FRAME_WIDTH,
        }
    }
}
