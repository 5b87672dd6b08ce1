//! Stereo pair selection by joint detection success.
//!
//! Synchronized captures are paired position by position; a pair survives
//! only if the full corner grid is found on both members. Dropped pairs and
//! length mismatches are logged and otherwise ignored, so a single bad
//! capture never aborts a run.

use std::path::{Path, PathBuf};

use chesscal_core::{PatternGeometry, StereoPair};
use chesscal_detect::{detect_corners, DetectorParams, GrayImage};
use log::{info, warn};

/// Pair `left[i]` with `right[i]` wherever `detect` succeeds on both.
///
/// The detection predicate is injected so callers can substitute cheaper
/// checks (or canned outcomes in tests) for the full image pipeline.
pub fn select_pairs_with<F>(left: &[PathBuf], right: &[PathBuf], mut detect: F) -> Vec<StereoPair>
where
    F: FnMut(&Path) -> bool,
{
    if left.len() != right.len() {
        warn!(
            "camera image counts differ ({} left vs {} right); pairing up to the shorter list",
            left.len(),
            right.len()
        );
    }

    let mut pairs = Vec::new();
    for (l, r) in left.iter().zip(right.iter()) {
        if detect(l) && detect(r) {
            pairs.push(StereoPair {
                left: l.clone(),
                right: r.clone(),
            });
        } else {
            warn!(
                "dropping pair ({}, {}): chessboard not found on both images",
                l.display(),
                r.display()
            );
        }
    }
    info!(
        "selected {} of {} candidate pairs",
        pairs.len(),
        left.len().min(right.len())
    );
    pairs
}

/// Pair synchronized captures using full-grid detection on each image.
///
/// Integer-pixel detection is enough to judge pair validity; sub-pixel
/// refinement is deferred to the calibration stage.
pub fn select_stereo_pairs(
    left: &[PathBuf],
    right: &[PathBuf],
    geometry: &PatternGeometry,
    params: &DetectorParams,
) -> Vec<StereoPair> {
    select_pairs_with(left, right, |path| match GrayImage::open(path) {
        Ok(img) => detect_corners(&img, geometry, params).is_ok(),
        Err(err) => {
            warn!("{err}");
            false
        }
    })
}
