use chesscal_core::{Mat3, Pt2};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("svd failed")]
    SvdFailed,
    #[error("homography is degenerate (zero scale)")]
    Degenerate,
}

/// Estimate H such that `image ~ H * plane` using the normalized DLT.
///
/// Both point sets are Hartley-normalized (centroid at the origin, mean
/// distance √2) before building the constraint matrix; pixel-scale inputs
/// would otherwise produce a badly conditioned system.
pub fn dlt_homography(plane: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = plane.len();
    if n < 4 || image.len() != n {
        return Err(HomographyError::NotEnoughPoints(n.min(image.len())));
    }

    let t_plane = normalizing_transform(plane);
    let t_image = normalizing_transform(image);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for (i, (pw, pi)) in plane.iter().zip(image.iter()).enumerate() {
        let w = apply(&t_plane, pw);
        let p = apply(&t_image, pi);
        let (x, y) = (w.x, w.y);
        let (u, v) = (p.x, p.y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Solve A h = 0 via SVD (right singular vector of the smallest value).
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let h = v_t.row(v_t.nrows() - 1);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    // Undo the normalization: H = T_image^-1 * H_norm * T_plane
    let t_image_inv = t_image
        .try_inverse()
        .ok_or(HomographyError::Degenerate)?;
    let mut h_mat = t_image_inv * h_norm * t_plane;

    let scale = h_mat[(2, 2)];
    if scale.abs() < f64::EPSILON {
        return Err(HomographyError::Degenerate);
    }
    h_mat /= scale;

    Ok(h_mat)
}

fn normalizing_transform(points: &[Pt2]) -> Mat3 {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > f64::EPSILON {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply(t: &Mat3, p: &Pt2) -> Pt2 {
    Pt2::new(t[(0, 0)] * p.x + t[(0, 2)], t[(1, 1)] * p.y + t[(1, 2)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_pure_scale() {
        let w = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let img: Vec<Pt2> = w.iter().map(|p| Pt2::new(2.0 * p.x, 2.0 * p.y)).collect();

        let h = dlt_homography(&w, &img).unwrap();
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((h[(1, 1)] - 2.0).abs() < 1e-9);
        assert!(h[(0, 1)].abs() < 1e-9);
    }

    #[test]
    fn recovers_projective_warp_at_pixel_scale() {
        let h_gt = Mat3::new(750.0, 12.0, 320.0, -8.0, 762.0, 241.0, 1e-4, -2e-4, 1.0);
        let plane: Vec<Pt2> = (0..5)
            .flat_map(|j| (0..6).map(move |i| Pt2::new(i as f64 * 0.03, j as f64 * 0.03)))
            .collect();
        let image: Vec<Pt2> = plane
            .iter()
            .map(|p| {
                let v = h_gt * chesscal_core::to_homogeneous(p);
                chesscal_core::from_homogeneous(&v)
            })
            .collect();

        let h = dlt_homography(&plane, &image).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert!(
                    (h[(r, c)] - h_gt[(r, c)]).abs() < 1e-6 * h_gt[(r, c)].abs().max(1.0),
                    "H[{r},{c}] = {} vs {}",
                    h[(r, c)],
                    h_gt[(r, c)]
                );
            }
        }
    }

    #[test]
    fn too_few_points_is_an_error() {
        let pts = vec![Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0)];
        assert!(matches!(
            dlt_homography(&pts, &pts),
            Err(HomographyError::NotEnoughPoints(2))
        ));
    }
}
