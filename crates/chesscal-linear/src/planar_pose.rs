//! Per-view pose from a plane-to-image homography.
//!
//! With known intrinsics, `H = K [r1 r2 t]` up to scale for a target on
//! `z = 0`. Normalizing `K^-1 H` by the first rotation column's length and
//! re-orthonormalizing yields the board-to-camera pose used to seed the
//! nonlinear refinement.

use chesscal_core::{FxFyCxCy, Iso3, Mat3, Real};
use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PoseError {
    #[error("homography yields a non-finite or zero-scale pose")]
    Degenerate,
}

/// Decompose a homography into a board-to-camera pose.
pub fn pose_from_homography(intrinsics: &FxFyCxCy, h: &Mat3) -> Result<Iso3, PoseError> {
    let k_inv = Mat3::new(
        1.0 / intrinsics.fx,
        0.0,
        -intrinsics.cx / intrinsics.fx,
        0.0,
        1.0 / intrinsics.fy,
        -intrinsics.cy / intrinsics.fy,
        0.0,
        0.0,
        1.0,
    );
    let m = k_inv * h;

    let c1 = Vector3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let c2 = Vector3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let c3 = Vector3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);

    let scale = c1.norm();
    if !scale.is_finite() || scale <= Real::EPSILON {
        return Err(PoseError::Degenerate);
    }
    // Sign so the board sits in front of the camera.
    let sign = if c3.z < 0.0 { -1.0 } else { 1.0 };
    let lambda = sign / scale;

    let r1 = c1 * lambda;
    let r2 = c2 * lambda;
    let t = c3 * lambda;
    if !(r1.iter().all(|v| v.is_finite())
        && r2.iter().all(|v| v.is_finite())
        && t.iter().all(|v| v.is_finite()))
    {
        return Err(PoseError::Degenerate);
    }

    // Nearest rotation to [r1 r2 r1xr2] in the Frobenius sense.
    let r3 = r1.cross(&r2);
    let approx = Mat3::from_columns(&[r1, r2, r3]);
    let svd = approx.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::Degenerate);
    };
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.set_column(2, &(-u.column(2)));
        rot = u_flipped * v_t;
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));
    Ok(Iso3::from_parts(Translation3::from(t), rotation))
}
