//! Coordinate projection from grid cells onto a noise-sampling manifold.
//!
//! The same synthesis code serves both world shapes; a [`Projection`] only
//! decides where a cell lands in noise space, which axes the domain warps
//! push, how finely each field is sampled, and whether north/south wraps.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

/// A point in 4D noise space. Three-dimensional embeddings leave `w` at zero.
pub type NoisePoint = [f64; 4];

/// World topology, used by configuration to pick a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Wraps east/west and north/south (torus)
    #[default]
    Toroidal,
    /// Wraps east/west only, rows compress toward the poles (sphere)
    Polar,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toroidal => write!(f, "toroidal"),
            Self::Polar => write!(f, "polar"),
        }
    }
}

/// Base frequencies of each synthesized field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldFrequencies {
    pub terrain: f64,
    pub terrain_ridged: f64,
    pub heat: f64,
    pub moisture: f64,
    /// Ridged warp applied to heat and moisture
    pub warp: f64,
}

/// Which component of the noise point each field's domain warp perturbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WarpAxes {
    pub height: usize,
    pub heat: usize,
    pub moisture: usize,
}

/// The part of the full-resolution map currently being sampled.
///
/// `start_*` are full-resolution cell origins; `used_*` the full-resolution
/// extent the `width x height` output grid is stretched over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub width: usize,
    pub height: usize,
    pub start_x: usize,
    pub start_y: usize,
    pub used_width: usize,
    pub used_height: usize,
}

impl Window {
    /// The whole map at full resolution.
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            start_x: 0,
            start_y: 0,
            used_width: width,
            used_height: height,
        }
    }

    /// Fractional full-resolution column of output column `x`.
    #[inline]
    pub fn column_position(&self, x: usize) -> f64 {
        self.start_x as f64 + x as f64 * (self.used_width as f64 / self.width as f64)
    }

    /// Fractional full-resolution row of output row `y`.
    #[inline]
    pub fn row_position(&self, y: usize) -> f64 {
        self.start_y as f64 + y as f64 * (self.used_height as f64 / self.height as f64)
    }
}

/// Maps grid positions onto the noise manifold.
pub trait Projection {
    fn topology(&self) -> Topology;

    fn frequencies(&self) -> FieldFrequencies;

    fn warp_axes(&self) -> WarpAxes;

    /// Whether the north and south edges meet.
    fn wraps_y(&self) -> bool;

    /// Angle of a fractional full-resolution row.
    fn row_angle(&self, row: f64, height: usize) -> f64;

    /// Noise point for a column angle and row angle, both given as `(sin, cos)`.
    fn project(&self, column: (f64, f64), row: (f64, f64)) -> NoisePoint;

    /// Angle of a fractional full-resolution column. Every topology wraps
    /// east/west, so a full turn spans the map width.
    fn column_angle(&self, column: f64, width: usize) -> f64 {
        column * TAU / width as f64
    }

    /// `(sin, cos)` of every output column's angle for one pass.
    fn column_table(&self, window: &Window) -> Vec<(f64, f64)> {
        (0..window.width)
            .map(|x| self.column_angle(window.column_position(x), window.width).sin_cos())
            .collect()
    }
}

/// 4D torus embedding: both axes map to full circles, so the world tiles
/// seamlessly in both directions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Toroidal;

impl Projection for Toroidal {
    fn topology(&self) -> Topology {
        Topology::Toroidal
    }

    fn frequencies(&self) -> FieldFrequencies {
        FieldFrequencies {
            terrain: 1.175,
            terrain_ridged: 1.3,
            heat: 2.8,
            moisture: 2.9,
            warp: 4.5,
        }
    }

    fn warp_axes(&self) -> WarpAxes {
        WarpAxes { height: 0, heat: 2, moisture: 3 }
    }

    fn wraps_y(&self) -> bool {
        true
    }

    fn row_angle(&self, row: f64, height: usize) -> f64 {
        row * TAU / height as f64
    }

    fn project(&self, (ps, pc): (f64, f64), (qs, qc): (f64, f64)) -> NoisePoint {
        [pc, ps, qc, qs]
    }
}

/// 3D sphere embedding: longitude wraps, latitude runs strictly between the
/// poles. Rows near the poles cover less of the sphere than rows at the
/// equator, which is the intended distortion for a spherical projection.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolarDistorted;

impl Projection for PolarDistorted {
    fn topology(&self) -> Topology {
        Topology::Polar
    }

    fn frequencies(&self) -> FieldFrequencies {
        FieldFrequencies {
            terrain: 1.5,
            terrain_ridged: 1.8,
            heat: 2.1,
            moisture: 2.125,
            warp: 3.375,
        }
    }

    fn warp_axes(&self) -> WarpAxes {
        WarpAxes { height: 0, heat: 1, moisture: 2 }
    }

    fn wraps_y(&self) -> bool {
        false
    }

    fn row_angle(&self, row: f64, height: usize) -> f64 {
        -FRAC_PI_2 + PI * (row + 1.0) / (height as f64 + 1.0)
    }

    fn project(&self, (ps, pc): (f64, f64), (qs, qc): (f64, f64)) -> NoisePoint {
        [qc * pc, qc * ps, qs, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: NoisePoint, b: NoisePoint) {
        for i in 0..4 {
            assert!((a[i] - b[i]).abs() < 1e-12, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_toroidal_seam_is_identical() {
        let torus = Toroidal;
        for y in 0..64 {
            let row = torus.row_angle(y as f64, 64).sin_cos();
            let west = torus.project(torus.column_angle(0.0, 64).sin_cos(), row);
            let east = torus.project(torus.column_angle(64.0, 64).sin_cos(), row);
            assert_close(west, east);
        }
        let column = torus.column_angle(10.0, 64).sin_cos();
        let north = torus.project(column, torus.row_angle(0.0, 64).sin_cos());
        let south = torus.project(column, torus.row_angle(64.0, 64).sin_cos());
        assert_close(north, south);
    }

    #[test]
    fn test_polar_rows_exclude_poles() {
        let sphere = PolarDistorted;
        let first = sphere.row_angle(0.0, 32);
        let last = sphere.row_angle(31.0, 32);
        assert!(first > -FRAC_PI_2 && last < FRAC_PI_2);
        assert!((first + last).abs() < 1e-12, "rows are symmetric about the equator");
    }

    #[test]
    fn test_polar_points_lie_on_unit_sphere() {
        let sphere = PolarDistorted;
        for y in 0..16 {
            let row = sphere.row_angle(y as f64, 16).sin_cos();
            for x in 0..16 {
                let p = sphere.project(sphere.column_angle(x as f64, 16).sin_cos(), row);
                let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
                assert!((r - 1.0).abs() < 1e-12);
                assert_eq!(p[3], 0.0);
            }
        }
    }

    #[test]
    fn test_window_positions() {
        let full = Window::full(64, 32);
        assert_eq!(full.column_position(10), 10.0);

        let zoomed = Window { start_x: 16, start_y: 8, used_width: 32, used_height: 16, ..full };
        assert_eq!(zoomed.column_position(0), 16.0);
        assert_eq!(zoomed.column_position(2), 17.0);
        assert_eq!(zoomed.row_position(4), 10.0);
        assert_eq!(Toroidal.column_table(&zoomed).len(), 64);
    }
}
