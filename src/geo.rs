//! # Geographic Projection
//!
//! Converts thermal grid coordinates into ground coordinates using a
//! simplified pinhole camera model.
//!
//! The camera ray through a pixel is rotated by the vehicle attitude
//! (`Rz(yaw) · Ry(pitch) · Rx(roll)`) and intersected with a flat ground
//! plane `altitude` metres below the vehicle. Metric offsets are converted to
//! degrees with a spherical approximation, adequate over the few hundred
//! metres a payload sees.

use crate::telemetry::generator::round_to;
use crate::telemetry::snapshot::GeoPoint;
use crate::thermal::frame::{HotSpot, FRAME_HEIGHT, FRAME_WIDTH};

/// Metres per degree of latitude
pub const METRES_PER_DEGREE: f64 = 111_111.0;

/// Horizontal field of view of the wide-angle thermal lens, in degrees
pub const DEFAULT_HORIZONTAL_FOV_DEG: f64 = 110.0;

/// Decimal places kept on projected coordinates
const COORDINATE_DECIMALS: i32 = 4;

/// Vehicle position and attitude at capture time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehiclePose {
    /// Height above ground in metres
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub roll: f64,
    /// Degrees
    pub yaw: f64,
}

/// Pinhole model of the thermal camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    width: usize,
    height: usize,
    horizontal_fov_deg: f64,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT, DEFAULT_HORIZONTAL_FOV_DEG)
    }
}

impl CameraModel {
    pub fn new(width: usize, height: usize, horizontal_fov_deg: f64) -> Self {
        Self {
            width,
            height,
            horizontal_fov_deg,
        }
    }

    pub fn horizontal_fov_deg(&self) -> f64 {
        self.horizontal_fov_deg
    }

    /// Focal length in pixel units
    pub fn focal_length(&self) -> f64 {
        (self.width as f64 / 2.0) / (self.horizontal_fov_deg.to_radians() / 2.0).tan()
    }

    /// Project a grid cell onto the ground
    ///
    /// # Arguments
    ///
    /// * `spot` - Grid cell to project
    /// * `pose` - Vehicle position and attitude when the frame was captured
    ///
    /// # Returns
    ///
    /// The estimated ground coordinate rounded to 4 decimal places. A ray
    /// parallel to the ground yields the vehicle position.
    pub fn project(&self, spot: HotSpot, pose: &VehiclePose) -> GeoPoint {
        let f = self.focal_length();
        let dx = spot.column as f64 - self.width as f64 / 2.0;
        let dy = spot.row as f64 - self.height as f64 / 2.0;

        let norm = (dx * dx + dy * dy + f * f).sqrt();
        let ray = [dx / norm, dy / norm, f / norm];
        let world = rotate(&attitude_matrix(pose), ray);

        if world[2] == 0.0 {
            return GeoPoint::new(
                round_to(pose.latitude, COORDINATE_DECIMALS),
                round_to(pose.longitude, COORDINATE_DECIMALS),
            );
        }

        let t = -pose.altitude / world[2];
        let north_m = world[0] * t;
        let east_m = world[1] * t;

        let latitude = pose.latitude + north_m / METRES_PER_DEGREE;
        let longitude =
            pose.longitude + east_m / (METRES_PER_DEGREE * pose.latitude.to_radians().cos());

        GeoPoint::new(
            round_to(latitude, COORDINATE_DECIMALS),
            round_to(longitude, COORDINATE_DECIMALS),
        )
    }

    /// Project every spot in order
    pub fn project_all(&self, spots: &[HotSpot], pose: &VehiclePose) -> Vec<GeoPoint> {
        spots.iter().map(|&spot| self.project(spot, pose)).collect()
    }
}

type Matrix = [[f64; 3]; 3];

fn attitude_matrix(pose: &VehiclePose) -> Matrix {
    let (sr, cr) = pose.roll.to_radians().sin_cos();
    let (sp, cp) = pose.pitch.to_radians().sin_cos();
    let (sy, cy) = pose.yaw.to_radians().sin_cos();

    let rx = [[1.0, 0.0, 0.0], [0.0, cr, -sr], [0.0, sr, cr]];
    let ry = [[cp, 0.0, sp], [0.0, 1.0, 0.0], [-sp, 0.0, cp]];
    let rz = [[cy, -sy, 0.0], [sy, cy, 0.0], [0.0, 0.0, 1.0]];

    multiply(&multiply(&rz, &ry), &rx)
}

fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn rotate(m: &Matrix, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}
