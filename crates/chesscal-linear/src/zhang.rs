use chesscal_core::{FxFyCxCy, Mat3, Real};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZhangError {
    #[error("need at least {min} homographies for intrinsics estimation, got {got}")]
    NotEnoughViews { min: usize, got: usize },
    #[error("svd failed")]
    SvdFailed,
    #[error("degenerate view geometry: {0}")]
    Degenerate(&'static str),
}

/// Build the 6-vector v_ij(H) of Zhang's orthogonality constraints for
/// columns `i`, `j` of a plane homography.
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> nalgebra::SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    nalgebra::SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate the camera matrix K from a set of plane homographies using
/// Zhang's closed-form solution (no distortion, zero skew reported).
///
/// Requires at least 3 homographies with orientation variation between
/// views; a set of views sharing a single board orientation leaves the
/// constraint system rank-deficient and is reported as degenerate rather
/// than producing an implausible K.
pub fn intrinsics_from_homographies(hmtxs: &[Mat3]) -> Result<FxFyCxCy, ZhangError> {
    if hmtxs.len() < 3 {
        return Err(ZhangError::NotEnoughViews {
            min: 3,
            got: hmtxs.len(),
        });
    }

    let m = hmtxs.len();
    let mut vmtx = DMatrix::<Real>::zeros(2 * m, 6);

    for (k, hmtx) in hmtxs.iter().enumerate() {
        let v11 = v_ij(hmtx, 0, 0);
        let v22 = v_ij(hmtx, 1, 1);
        let v12 = v_ij(hmtx, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    // Solve V b = 0 via SVD: singular vector of the smallest singular value.
    let svd = vmtx.svd(false, true);
    let v_t = svd.v_t.ok_or(ZhangError::SvdFailed)?;

    // A one-dimensional nullspace pins down the conic image B up to scale.
    // If the second-smallest singular value also vanishes, the views do not
    // constrain B (e.g. every view shares one board orientation).
    let sv = &svd.singular_values;
    if sv.len() >= 2 && sv[sv.len() - 2] <= 1e-9 * sv[0].max(f64::EPSILON) {
        return Err(ZhangError::Degenerate(
            "nullspace dimension > 1 (no orientation variation between views?)",
        ));
    }
    let b = v_t.row(v_t.nrows() - 1);

    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    // Closed-form extraction of K from the absolute conic image B.
    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    let denom_rel = if denom_norm > 0.0 {
        denom.abs() / denom_norm
    } else {
        0.0
    };
    if denom_rel <= 1e-8 {
        return Err(ZhangError::Degenerate(
            "constraint matrix is rank-deficient (no orientation variation between views?)",
        ));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    if lambda.signum() != b11.signum() {
        return Err(ZhangError::Degenerate("invalid sign for lambda"));
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    if !(alpha.is_finite() && beta.is_finite() && u0.is_finite() && v0.is_finite()) {
        return Err(ZhangError::Degenerate("non-finite intrinsics"));
    }

    // Skew is dropped: the pipeline's camera model assumes square sensor
    // axes, and gamma absorbs only noise for modern sensors.
    Ok(FxFyCxCy {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
    })
}
