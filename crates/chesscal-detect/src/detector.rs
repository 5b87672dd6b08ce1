//! Full-board corner detection entry points.

use std::path::Path;

use chesscal_core::{PatternGeometry, Pt2, Real};
use log::debug;
use thiserror::Error;

use crate::gray::{GrayImage, ImageLoadError};
use crate::lattice::{order_grid, GridError};
use crate::response::{corner_response, find_candidates};
use crate::subpix::{refine_corner, SubpixCriteria};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Load(#[from] ImageLoadError),
    #[error("chessboard not found: {0}")]
    NotFound(#[from] GridError),
}

/// Tuning knobs for the detection stages.
#[derive(Debug, Clone, Copy)]
pub struct DetectorParams {
    /// Candidate threshold relative to the strongest response.
    pub threshold_rel: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: usize,
    /// Half-width of the sub-pixel refinement window.
    pub refine_window: usize,
    /// Sub-pixel termination criterion.
    pub criteria: SubpixCriteria,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.3,
            nms_radius: 4,
            refine_window: 5,
            criteria: SubpixCriteria::default(),
        }
    }
}

/// Detect the full interior corner grid at integer-pixel accuracy.
///
/// The returned corners are in canonical order, index-aligned with
/// [`PatternGeometry::object_points`].
pub fn detect_corners(
    img: &GrayImage,
    geometry: &PatternGeometry,
    params: &DetectorParams,
) -> Result<Vec<Pt2>, GridError> {
    let resp = corner_response(img);
    let raw = find_candidates(&resp, params.nms_radius, params.threshold_rel);
    debug!(
        "{} candidates for a {}x{} grid",
        raw.len(),
        geometry.cols,
        geometry.rows
    );
    let candidates: Vec<Pt2> = raw
        .into_iter()
        .map(|(x, y)| Pt2::new(x as Real, y as Real))
        .collect();
    order_grid(&candidates, geometry.cols, geometry.rows)
}

/// Detect the grid and refine every corner to sub-pixel accuracy.
pub fn detect_and_refine(
    img: &GrayImage,
    geometry: &PatternGeometry,
    params: &DetectorParams,
) -> Result<Vec<Pt2>, GridError> {
    let corners = detect_corners(img, geometry, params)?;
    Ok(corners
        .into_iter()
        .map(|c| refine_corner(img, c, params.refine_window, params.criteria))
        .collect())
}

/// Load an image file and run the refined detection on it.
pub fn detect_in_file(
    path: &Path,
    geometry: &PatternGeometry,
    params: &DetectorParams,
) -> Result<Vec<Pt2>, DetectError> {
    let img = GrayImage::open(path)?;
    let corners = detect_and_refine(&img, geometry, params)?;
    Ok(corners)
}
