//! Distortion removal by inverse remapping.
//!
//! The destination image lives on an ideal pinhole camera whose intrinsics
//! are blended between two extremes: `alpha = 0` crops to the largest
//! all-valid rectangle, `alpha = 1` retains every source pixel and accepts
//! black fill at the borders. Each destination pixel is mapped backward
//! through the distortion model and sampled bilinearly from the source, so
//! no forward-splatting holes can appear.

use chesscal_core::{FxFyCxCy, PinholeCamera, Real, Vec2};
use chesscal_detect::GrayImage;

/// Grid resolution for the rectangle estimation.
const GRID_N: usize = 9;

/// Pinhole intrinsics for the undistorted view at the given `alpha`.
///
/// Samples a pixel grid over the source, undistorts it onto the normalized
/// plane, and fits two rectangles: the inner one touched by the image
/// borders (every pixel inside it has a valid source) and the outer
/// bounding box (no source pixel outside it). The returned intrinsics map
/// the `alpha`-blend of the two onto a `size` viewport.
pub fn optimal_new_intrinsics(
    camera: &PinholeCamera,
    size: (usize, usize),
    alpha: Real,
) -> FxFyCxCy {
    let (w, h) = size;
    let alpha = alpha.clamp(0.0, 1.0);

    let mut outer_x0 = Real::INFINITY;
    let mut outer_x1 = Real::NEG_INFINITY;
    let mut outer_y0 = Real::INFINITY;
    let mut outer_y1 = Real::NEG_INFINITY;
    let mut inner_x0 = Real::NEG_INFINITY;
    let mut inner_x1 = Real::INFINITY;
    let mut inner_y0 = Real::NEG_INFINITY;
    let mut inner_y1 = Real::INFINITY;

    for gy in 0..GRID_N {
        for gx in 0..GRID_N {
            let px = gx as Real * (w - 1) as Real / (GRID_N - 1) as Real;
            let py = gy as Real * (h - 1) as Real / (GRID_N - 1) as Real;
            let n = camera.undistort_pixel(&Vec2::new(px, py));

            outer_x0 = outer_x0.min(n.x);
            outer_x1 = outer_x1.max(n.x);
            outer_y0 = outer_y0.min(n.y);
            outer_y1 = outer_y1.max(n.y);

            if gx == 0 {
                inner_x0 = inner_x0.max(n.x);
            }
            if gx == GRID_N - 1 {
                inner_x1 = inner_x1.min(n.x);
            }
            if gy == 0 {
                inner_y0 = inner_y0.max(n.y);
            }
            if gy == GRID_N - 1 {
                inner_y1 = inner_y1.min(n.y);
            }
        }
    }

    let viewport = |x0: Real, x1: Real, y0: Real, y1: Real| -> FxFyCxCy {
        let fx = (w - 1) as Real / (x1 - x0);
        let fy = (h - 1) as Real / (y1 - y0);
        FxFyCxCy {
            fx,
            fy,
            cx: -fx * x0,
            cy: -fy * y0,
        }
    };
    let crop = viewport(inner_x0, inner_x1, inner_y0, inner_y1);
    let full = viewport(outer_x0, outer_x1, outer_y0, outer_y1);

    FxFyCxCy {
        fx: crop.fx * (1.0 - alpha) + full.fx * alpha,
        fy: crop.fy * (1.0 - alpha) + full.fy * alpha,
        cx: crop.cx * (1.0 - alpha) + full.cx * alpha,
        cy: crop.cy * (1.0 - alpha) + full.cy * alpha,
    }
}

/// Remap an image through the camera model onto an undistorted view.
///
/// The output always has the source dimensions; destination pixels whose
/// source falls outside the image are black.
pub fn undistort_image(img: &GrayImage, camera: &PinholeCamera, alpha: Real) -> GrayImage {
    let (w, h) = img.dimensions();
    let new_k = optimal_new_intrinsics(camera, (w, h), alpha);
    undistort_with(img, camera, &new_k)
}

/// Remap onto an explicit destination pinhole, same dimensions as `img`.
pub fn undistort_with(img: &GrayImage, camera: &PinholeCamera, new_k: &FxFyCxCy) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let n = new_k.pixel_to_normalized(&Vec2::new(x as Real, y as Real));
            let src = camera
                .intrinsics
                .normalized_to_pixel(&camera.distortion.distort(&n));
            if src.x < 0.0 || src.y < 0.0 || src.x > (w - 1) as Real || src.y > (h - 1) as Real {
                continue;
            }
            out.set(x, y, img.sample_bilinear(src.x, src.y) as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chesscal_core::BrownConrady5;

    fn barrel_camera() -> PinholeCamera {
        PinholeCamera::new(
            FxFyCxCy {
                fx: 420.0,
                fy: 420.0,
                cx: 320.0,
                cy: 240.0,
            },
            BrownConrady5 {
                k1: -0.25,
                k2: 0.05,
                p1: 0.0005,
                p2: -0.0003,
                k3: 0.0,
            },
        )
    }

    fn gradient_image(w: usize, h: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = 0.5
                    + 0.25 * ((x as Real) * 0.05).sin() as f32
                    + 0.25 * ((y as Real) * 0.07).cos() as f32;
                img.set(x, y, 0.05 + v * 0.45);
            }
        }
        img
    }

    #[test]
    fn zero_distortion_is_the_identity_remap() {
        let cam = PinholeCamera::new(
            FxFyCxCy {
                fx: 420.0,
                fy: 420.0,
                cx: 320.0,
                cy: 240.0,
            },
            BrownConrady5::default(),
        );
        let new_k = optimal_new_intrinsics(&cam, (640, 480), 0.0);
        assert!((new_k.fx - 420.0).abs() < 1e-6, "fx = {}", new_k.fx);
        assert!((new_k.fy - 420.0).abs() < 1e-6, "fy = {}", new_k.fy);
        assert!((new_k.cx - 320.0).abs() < 1e-6, "cx = {}", new_k.cx);
        assert!((new_k.cy - 240.0).abs() < 1e-6, "cy = {}", new_k.cy);

        let img = gradient_image(640, 480);
        let out = undistort_image(&img, &cam, 0.0);
        for y in (10..470).step_by(37) {
            for x in (10..630).step_by(41) {
                assert!(
                    (out.get(x, y) - img.get(x, y)).abs() < 1e-4,
                    "pixel ({x}, {y}) changed"
                );
            }
        }
    }

    #[test]
    fn alpha_zero_leaves_no_invalid_pixels() {
        let cam = barrel_camera();
        let img = gradient_image(640, 480);
        let out = undistort_image(&img, &cam, 0.0);
        // The source image is strictly positive, so any remaining zero is
        // out-of-bounds fill. The rectangle estimate samples the border at
        // grid resolution, so allow a small border margin.
        for y in 2..478 {
            for x in 2..638 {
                assert!(out.get(x, y) > 0.0, "black fill at ({x}, {y})");
            }
        }
    }

    #[test]
    fn alpha_one_retains_every_source_pixel() {
        let cam = barrel_camera();
        let new_k = optimal_new_intrinsics(&cam, (640, 480), 1.0);
        // Every source pixel must land inside the destination viewport.
        for &(px, py) in &[
            (0.0, 0.0),
            (639.0, 0.0),
            (0.0, 479.0),
            (639.0, 479.0),
            (320.0, 0.0),
            (0.0, 240.0),
        ] {
            let n = cam.undistort_pixel(&Vec2::new(px, py));
            let dst = new_k.normalized_to_pixel(&n);
            assert!(
                dst.x >= -0.5 && dst.x <= 639.5 && dst.y >= -0.5 && dst.y <= 479.5,
                "source ({px}, {py}) maps outside the viewport: {dst:?}"
            );
        }
    }

    #[test]
    fn distort_then_undistort_roundtrips_away_from_borders() {
        let cam = barrel_camera();
        let (w, h) = (640usize, 480usize);
        let ideal = gradient_image(w, h);

        // Simulate the lens: each captured pixel sees the ideal scene at its
        // undistorted location.
        let mut captured = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let n = cam.undistort_pixel(&Vec2::new(x as Real, y as Real));
                let src = cam.intrinsics.normalized_to_pixel(&n);
                captured.set(x, y, ideal.sample_bilinear(src.x, src.y) as f32);
            }
        }

        // Undistorting onto the original intrinsics must recover the scene.
        let recovered = undistort_with(&captured, &cam, &cam.intrinsics);
        for y in (60..h - 60).step_by(23) {
            for x in (60..w - 60).step_by(29) {
                let err = (recovered.get(x, y) - ideal.get(x, y)).abs();
                assert!(err < 5e-3, "pixel ({x}, {y}) off by {err}");
            }
        }
    }

    #[test]
    fn output_dimensions_match_the_input() {
        let cam = barrel_camera();
        let img = gradient_image(100, 80);
        let out = undistort_image(&img, &cam, 0.7);
        assert_eq!(out.dimensions(), (100, 80));
    }
}
