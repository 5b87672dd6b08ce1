//! Per-camera calibration driver.
//!
//! The solve is a two-step pipeline: a closed-form bootstrap (per-view
//! homographies, Zhang intrinsics, pose decomposition) followed by joint
//! Levenberg-Marquardt refinement of intrinsics, distortion, and all board
//! poses. There are no partial results: a set that cannot support the
//! bootstrap fails loudly instead of returning a half-solved camera.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chesscal_core::{
    CorrespondenceSet, CorrespondenceView, Iso3, PatternGeometry, PinholeCamera, Real,
};
use chesscal_detect::{detect_and_refine, DetectorParams, GrayImage};
use chesscal_linear::{dlt_homography, intrinsics_from_homographies, pose_from_homography};
use chesscal_optim::{
    refine_planar_intrinsics, rms_reproj_error, LmBackend, PlanarIntrinsicsProblem, SolveOptions,
    SolveReport,
};
use log::{info, warn};
use rayon::prelude::*;
use thiserror::Error;

/// Planar calibration needs view diversity; below this the Zhang system is
/// underdetermined for four intrinsics.
pub const MIN_VIEWS: usize = 3;

#[derive(Debug, Error)]
pub enum CalibError {
    #[error("{0} usable views, need at least {MIN_VIEWS}")]
    InsufficientData(usize),
    #[error("degenerate view geometry: {0}")]
    Degenerate(String),
}

/// Solved camera model with per-view poses and fit diagnostics.
#[derive(Debug, Clone)]
pub struct CameraSolveResult {
    pub camera: PinholeCamera,
    /// Board-to-camera pose for each input view, in input order.
    pub poses: Vec<Iso3>,
    /// Final reprojection RMS in pixels.
    pub rms_reproj_error: Real,
    pub report: SolveReport,
}

/// Calibrate one camera from an ordered correspondence set.
///
/// `image_size` is `(width, height)` of the captures; a solution whose
/// principal point falls outside the image is rejected as degenerate.
pub fn solve_camera(
    set: CorrespondenceSet,
    image_size: (usize, usize),
) -> Result<CameraSolveResult, CalibError> {
    if set.num_views() < MIN_VIEWS {
        return Err(CalibError::InsufficientData(set.num_views()));
    }

    let homographies = set
        .views
        .iter()
        .map(|view| dlt_homography(&view.planar_points(), &view.points_2d))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CalibError::Degenerate(e.to_string()))?;

    let intrinsics = intrinsics_from_homographies(&homographies)
        .map_err(|e| CalibError::Degenerate(e.to_string()))?;
    let (w, h) = image_size;
    if !(intrinsics.cx > 0.0
        && intrinsics.cx < w as Real
        && intrinsics.cy > 0.0
        && intrinsics.cy < h as Real)
    {
        return Err(CalibError::Degenerate(format!(
            "principal point ({:.1}, {:.1}) outside the {w}x{h} image",
            intrinsics.cx, intrinsics.cy
        )));
    }

    let poses = homographies
        .iter()
        .map(|hm| pose_from_homography(&intrinsics, hm))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CalibError::Degenerate(e.to_string()))?;

    let init = PinholeCamera::new(intrinsics, Default::default());
    let problem = PlanarIntrinsicsProblem::new(set);
    let refined = refine_planar_intrinsics(
        &LmBackend,
        &problem,
        &init,
        &poses,
        &SolveOptions::default(),
    );

    let k = &refined.camera.intrinsics;
    if !(k.fx.is_finite() && k.fy.is_finite() && k.cx.is_finite() && k.cy.is_finite()) {
        return Err(CalibError::Degenerate(
            "refinement diverged to non-finite intrinsics".into(),
        ));
    }

    let rms = rms_reproj_error(problem.views(), &refined.camera, &refined.poses);
    info!(
        "calibrated over {} views: fx={:.2} fy={:.2} cx={:.2} cy={:.2}, rms={:.4} px",
        problem.num_views(),
        k.fx,
        k.fy,
        k.cx,
        k.cy,
        rms
    );

    Ok(CameraSolveResult {
        camera: refined.camera,
        poses: refined.poses,
        rms_reproj_error: rms,
        report: refined.report,
    })
}

/// Detect, refine, and solve over a list of capture files for one camera.
///
/// Detection fans out across threads; views keep the input file order.
/// Files where the board is not found are skipped with a warning.
pub fn calibrate_camera(
    paths: &[PathBuf],
    geometry: &PatternGeometry,
    params: &DetectorParams,
) -> Result<CameraSolveResult> {
    let detections: Vec<_> = paths
        .par_iter()
        .map(|path| {
            let img = match GrayImage::open(path) {
                Ok(img) => img,
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    return None;
                }
            };
            match detect_and_refine(&img, geometry, params) {
                Ok(corners) => Some((corners, img.dimensions())),
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    None
                }
            }
        })
        .collect();

    let object_points = geometry.object_points();
    let mut set = CorrespondenceSet::new();
    let mut image_size = None;
    for (corners, dims) in detections.into_iter().flatten() {
        set.push_view(CorrespondenceView::new(object_points.clone(), corners)?);
        image_size.get_or_insert(dims);
    }
    info!(
        "board found on {} of {} images",
        set.num_views(),
        paths.len()
    );

    let image_size = image_size.ok_or(CalibError::InsufficientData(0))?;
    solve_camera(set, image_size).context("camera calibration failed")
}
