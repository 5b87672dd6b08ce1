//! Planar chessboard target geometry.

use crate::{Pt3, Real};
use serde::{Deserialize, Serialize};

/// Geometry of a planar chessboard calibration target.
///
/// `cols` and `rows` count interior corner intersections (points where four
/// squares meet), not squares. A board of 11×8 squares has a 10×7 interior
/// corner grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternGeometry {
    /// Interior corners per row (column count, varies fastest).
    pub cols: usize,
    /// Interior corner rows.
    pub rows: usize,
    /// Square edge length in target units (meters, millimeters, ...).
    pub square_size: Real,
}

impl PatternGeometry {
    pub fn new(cols: usize, rows: usize, square_size: Real) -> Self {
        Self {
            cols,
            rows,
            square_size,
        }
    }

    /// Total number of interior corners.
    pub fn point_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Canonical 3D corner positions on the target plane `z = 0`.
    ///
    /// The corner at row `r`, column `c` is
    /// `(c * square_size, r * square_size, 0)`, emitted in row-major order
    /// with the column index varying fastest. Every 2D detection in the
    /// workspace is index-aligned with this ordering.
    pub fn object_points(&self) -> Vec<Pt3> {
        let mut points = Vec::with_capacity(self.point_count());
        for r in 0..self.rows {
            for c in 0..self.cols {
                points.push(Pt3::new(
                    c as Real * self.square_size,
                    r as Real * self.square_size,
                    0.0,
                ));
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_points_count_and_order() {
        let geom = PatternGeometry::new(10, 7, 0.025);
        let pts = geom.object_points();
        assert_eq!(pts.len(), 70);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(0.025, 0.0, 0.0));
        assert_eq!(pts[10], Pt3::new(0.0, 0.025, 0.0));
    }

    #[test]
    fn adjacent_points_differ_by_square_size() {
        let geom = PatternGeometry::new(6, 4, 0.03);
        let pts = geom.object_points();
        for r in 0..geom.rows {
            for c in 1..geom.cols {
                let a = pts[r * geom.cols + c - 1];
                let b = pts[r * geom.cols + c];
                assert!((b.x - a.x - geom.square_size).abs() < 1e-12);
                assert_eq!(b.y, a.y);
                assert_eq!(b.z, 0.0);
            }
        }
    }
}
