//! Correspondence containers handed to the calibration solver.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::{Pt2, Pt3};

/// One successfully detected view: index-aligned 3D target points and their
/// 2D pixel observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrespondenceView {
    /// 3D points in target coordinates (z = 0 for a planar board).
    pub points_3d: Vec<Pt3>,
    /// Corresponding detected pixel locations.
    pub points_2d: Vec<Pt2>,
}

impl CorrespondenceView {
    /// Construct a view, checking that the point counts match.
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "3D / 2D point counts must match: {} vs {}",
            points_3d.len(),
            points_2d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }

    /// Target points dropped onto the plane (z discarded).
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.points_3d.iter().map(|p| Pt2::new(p.x, p.y)).collect()
    }
}

/// Ordered, append-only collection of views for a single camera.
///
/// Built once per calibration run and moved by value into the solver; there
/// is no shared state between the detection and solving stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrespondenceSet {
    pub views: Vec<CorrespondenceView>,
}

impl CorrespondenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_view(&mut self, view: CorrespondenceView) {
        self.views.push(view);
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Total residual rows (2 per observed point) across all views.
    pub fn num_residuals(&self) -> usize {
        self.views.iter().map(|v| 2 * v.len()).sum()
    }
}

/// One left/right image pair captured at the same synchronization index.
///
/// Valid pairs require a successful detection on both members; pairing is
/// performed before each camera is calibrated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StereoPair {
    pub left: PathBuf,
    pub right: PathBuf,
}
