//! Synthetic planar target helpers.
//!
//! Generates simple camera poses and projects a [`PatternGeometry`] through
//! a known camera to produce [`CorrespondenceView`]s with exact ground
//! truth. Used by solver and pipeline tests across the workspace.

use anyhow::{bail, Result};
use nalgebra::{Translation3, UnitQuaternion, Vector3};

use crate::{CorrespondenceView, Iso3, PatternGeometry, PinholeCamera, Real};

/// Generate `n_views` poses that keep the board in front of the camera while
/// varying viewpoint: yaw about +Y, pitch about +X, and a Z ramp.
///
/// The alternating pitch sign breaks the planar degeneracy that a pure yaw
/// sweep would leave in Zhang's constraint system.
pub fn varied_poses(n_views: usize, z_start: Real, z_step: Real) -> Vec<Iso3> {
    (0..n_views)
        .map(|i| {
            let yaw = -0.25 + 0.09 * i as Real;
            let pitch = if i % 2 == 0 { 0.15 } else { -0.18 };
            let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 1.0, 0.0) * yaw)
                * UnitQuaternion::from_scaled_axis(Vector3::new(1.0, 0.0, 0.0) * pitch);
            let translation = Vector3::new(
                -0.1 + 0.02 * i as Real,
                -0.08 + 0.015 * i as Real,
                z_start + z_step * i as Real,
            );
            Iso3::from_parts(Translation3::from(translation), rotation)
        })
        .collect()
}

/// Project the target into the camera for one pose, requiring every corner
/// to be projectable.
pub fn project_view(
    camera: &PinholeCamera,
    cam_from_target: &Iso3,
    geometry: &PatternGeometry,
) -> Result<CorrespondenceView> {
    let points_3d = geometry.object_points();
    let mut points_2d = Vec::with_capacity(points_3d.len());
    for (idx, pw) in points_3d.iter().enumerate() {
        let pc = cam_from_target.transform_point(pw);
        let Some(uv) = camera.project_point(&pc) else {
            bail!("corner {idx} not projectable (z={:.6})", pc.z);
        };
        points_2d.push(crate::Pt2::new(uv.x, uv.y));
    }
    CorrespondenceView::new(points_3d, points_2d)
}

/// Project the target for a batch of poses.
pub fn project_views(
    camera: &PinholeCamera,
    geometry: &PatternGeometry,
    poses: &[Iso3],
) -> Result<Vec<CorrespondenceView>> {
    poses
        .iter()
        .map(|pose| project_view(camera, pose, geometry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrownConrady5, FxFyCxCy};

    #[test]
    fn projected_views_are_index_aligned() {
        let cam = PinholeCamera::new(
            FxFyCxCy {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            BrownConrady5::default(),
        );
        let geom = PatternGeometry::new(5, 4, 0.03);
        let poses = varied_poses(3, 0.7, 0.1);

        let views = project_views(&cam, &geom, &poses).unwrap();
        assert_eq!(views.len(), 3);
        for view in &views {
            assert_eq!(view.len(), geom.point_count());
        }
    }
}
