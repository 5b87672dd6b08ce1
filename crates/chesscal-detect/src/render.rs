//! Synthetic chessboard rendering through the full camera model.
//!
//! Ray-casts each pixel through the distortion model onto the board plane,
//! so rendered corners land exactly where [`PinholeCamera::project_point`]
//! puts them. Used to exercise the detector end to end without image
//! fixtures.

use chesscal_core::{Iso3, PatternGeometry, PinholeCamera, Pt3, Real, Vec2, Vec3};

use crate::gray::GrayImage;

const WHITE: f32 = 0.92;
const BLACK: f32 = 0.08;

/// Render a chessboard with the given board-to-camera pose.
///
/// The board's inner corners sit at `(c * square, r * square, 0)` in the
/// board frame; squares extend one unit beyond the corner grid on every
/// side so that all inner corners are true four-square intersections.
/// `supersample` subsamples per pixel axis provide anti-aliasing (2 or 3
/// is enough for sub-pixel tests).
pub fn render_chessboard(
    camera: &PinholeCamera,
    pose: &Iso3,
    geometry: &PatternGeometry,
    width: usize,
    height: usize,
    supersample: usize,
) -> GrayImage {
    let cam_to_board = pose.inverse();
    let origin_b = cam_to_board * Pt3::new(0.0, 0.0, 0.0);
    let ss = supersample.max(1);
    let step = 1.0 / ss as Real;

    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for sy in 0..ss {
                for sx in 0..ss {
                    let px = x as Real + (sx as Real + 0.5) * step - 0.5;
                    let py = y as Real + (sy as Real + 0.5) * step - 0.5;
                    acc += shade(camera, &cam_to_board, &origin_b, geometry, px, py);
                }
            }
            img.set(x, y, acc / (ss * ss) as f32);
        }
    }
    img
}

fn shade(
    camera: &PinholeCamera,
    cam_to_board: &Iso3,
    origin_b: &Pt3,
    geometry: &PatternGeometry,
    px: Real,
    py: Real,
) -> f32 {
    let n = camera.undistort_pixel(&Vec2::new(px, py));
    // Viewing ray in the board frame; rotation only for the direction.
    let dir_b = cam_to_board * Vec3::new(n.x, n.y, 1.0);
    if dir_b.z.abs() < 1e-12 {
        return WHITE;
    }
    let t = -origin_b.z / dir_b.z;
    if t <= 0.0 {
        return WHITE;
    }
    let hit = origin_b + dir_b * t;

    // Board coordinates in units of one square, corner grid at integers.
    let u = hit.x / geometry.square_size;
    let v = hit.y / geometry.square_size;
    let (cols, rows) = (geometry.cols as Real, geometry.rows as Real);
    if u < -1.0 || u > cols || v < -1.0 || v > rows {
        return WHITE;
    }
    let parity = (u.floor() as i64 + v.floor() as i64).rem_euclid(2);
    if parity == 0 {
        BLACK
    } else {
        WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chesscal_core::FxFyCxCy;
    use nalgebra::{Translation3, UnitQuaternion};

    fn plain_camera() -> PinholeCamera {
        PinholeCamera::new(
            FxFyCxCy {
                fx: 300.0,
                fy: 300.0,
                cx: 160.0,
                cy: 120.0,
            },
            Default::default(),
        )
    }

    fn facing_pose(geometry: &PatternGeometry, z: Real) -> Iso3 {
        // Center the corner grid on the optical axis.
        let tx = -0.5 * (geometry.cols - 1) as Real * geometry.square_size;
        let ty = -0.5 * (geometry.rows - 1) as Real * geometry.square_size;
        Iso3::from_parts(
            Translation3::new(tx, ty, z),
            UnitQuaternion::identity(),
        )
    }

    #[test]
    fn corners_land_where_projection_puts_them() {
        let cam = plain_camera();
        let geom = PatternGeometry::new(5, 4, 0.03);
        let pose = facing_pose(&geom, 0.6);
        let img = render_chessboard(&cam, &pose, &geom, 320, 240, 2);

        // Every projected corner must sit between a dark and a bright
        // square in both directions.
        for obj in geom.object_points() {
            let px = cam.project_point(&(pose * obj)).unwrap();
            let x = px.x.round() as usize;
            let y = px.y.round() as usize;
            let diag_a = img.get(x - 3, y - 3);
            let diag_b = img.get(x + 3, y + 3);
            let diag_c = img.get(x - 3, y + 3);
            let diag_d = img.get(x + 3, y - 3);
            assert!(
                (diag_a - diag_c).abs() > 0.5 && (diag_b - diag_d).abs() > 0.5,
                "no checker contrast around projected corner ({x}, {y})"
            );
        }
    }

    #[test]
    fn background_is_white() {
        let cam = plain_camera();
        let geom = PatternGeometry::new(5, 4, 0.03);
        let pose = facing_pose(&geom, 0.6);
        let img = render_chessboard(&cam, &pose, &geom, 320, 240, 1);
        assert!(img.get(2, 2) > 0.85);
        assert!(img.get(317, 237) > 0.85);
    }
}
