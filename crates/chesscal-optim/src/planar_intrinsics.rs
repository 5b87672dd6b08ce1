//! Joint refinement of intrinsics, distortion, and per-view board poses.
//!
//! Parameter vector layout: `[fx, fy, cx, cy, k1, k2, p1, p2, k3]` followed
//! by 6 values per view (axis-angle rotation, then translation), the
//! standard bundle layout for planar calibration.

use chesscal_core::{
    BrownConrady5, CorrespondenceSet, FxFyCxCy, Iso3, PinholeCamera, Real,
};
use nalgebra::{DVector, UnitQuaternion, Vector3};

use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Number of shared camera parameters ahead of the per-view pose blocks.
pub const CAMERA_PARAMS: usize = 9;

/// Reprojection residual problem over every view of one camera.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem {
    views: CorrespondenceSet,
}

impl PlanarIntrinsicsProblem {
    /// The set must be non-empty with at least 4 points per view; the
    /// calibration driver validates this before construction.
    pub fn new(views: CorrespondenceSet) -> Self {
        debug_assert!(!views.is_empty());
        Self { views }
    }

    pub fn num_views(&self) -> usize {
        self.views.num_views()
    }

    pub fn views(&self) -> &CorrespondenceSet {
        &self.views
    }

    pub fn param_dim(&self) -> usize {
        CAMERA_PARAMS + 6 * self.num_views()
    }

    /// Decode the parameter vector into a camera and per-view poses.
    pub fn decode(&self, x: &DVector<Real>) -> (PinholeCamera, Vec<Iso3>) {
        decode_params(self.num_views(), x)
    }
}

/// Pack a camera estimate and per-view poses into the parameter vector.
pub fn pack_params(camera: &PinholeCamera, poses: &[Iso3]) -> DVector<Real> {
    let mut x = DVector::zeros(CAMERA_PARAMS + 6 * poses.len());

    let k = &camera.intrinsics;
    x[0] = k.fx;
    x[1] = k.fy;
    x[2] = k.cx;
    x[3] = k.cy;

    let d = &camera.distortion;
    x[4] = d.k1;
    x[5] = d.k2;
    x[6] = d.p1;
    x[7] = d.p2;
    x[8] = d.k3;

    for (i, pose) in poses.iter().enumerate() {
        let idx = CAMERA_PARAMS + 6 * i;
        let axis_angle = pose.rotation.scaled_axis();
        x[idx] = axis_angle.x;
        x[idx + 1] = axis_angle.y;
        x[idx + 2] = axis_angle.z;

        let t = pose.translation.vector;
        x[idx + 3] = t.x;
        x[idx + 4] = t.y;
        x[idx + 5] = t.z;
    }

    x
}

fn decode_params(n_views: usize, x: &DVector<Real>) -> (PinholeCamera, Vec<Iso3>) {
    debug_assert_eq!(x.len(), CAMERA_PARAMS + 6 * n_views);

    let camera = PinholeCamera::new(
        FxFyCxCy {
            fx: x[0],
            fy: x[1],
            cx: x[2],
            cy: x[3],
        },
        BrownConrady5 {
            k1: x[4],
            k2: x[5],
            p1: x[6],
            p2: x[7],
            k3: x[8],
        },
    );

    let mut poses = Vec::with_capacity(n_views);
    for i in 0..n_views {
        let idx = CAMERA_PARAMS + 6 * i;
        let axis_angle = Vector3::new(x[idx], x[idx + 1], x[idx + 2]);
        let trans = Vector3::new(x[idx + 3], x[idx + 4], x[idx + 5]);
        poses.push(Iso3::from_parts(
            trans.into(),
            UnitQuaternion::from_scaled_axis(axis_angle),
        ));
    }

    (camera, poses)
}

impl NllsProblem for PlanarIntrinsicsProblem {
    fn num_params(&self) -> usize {
        self.param_dim()
    }

    fn num_residuals(&self) -> usize {
        self.views.num_residuals()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (camera, poses) = self.decode(x);

        let mut r = DVector::zeros(self.num_residuals());
        let mut offset = 0;

        for (view, pose) in self.views.views.iter().zip(poses.iter()) {
            for (pw, meas) in view.points_3d.iter().zip(view.points_2d.iter()) {
                let p_cam = pose.transform_point(pw);
                match camera.project_point(&p_cam) {
                    Some(proj) => {
                        r[offset] = meas.x - proj.x;
                        r[offset + 1] = meas.y - proj.y;
                    }
                    None => {
                        // Point moved behind the camera during a trial step:
                        // penalize so LM backs off.
                        r[offset] = 1e6;
                        r[offset + 1] = 1e6;
                    }
                }
                offset += 2;
            }
        }

        r
    }
}

/// Refined model with its per-view poses and solver report.
#[derive(Debug, Clone)]
pub struct PlanarRefinement {
    pub camera: PinholeCamera,
    pub poses: Vec<Iso3>,
    pub report: SolveReport,
}

/// Run the joint refinement from an initial camera and pose estimate.
pub fn refine_planar_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    problem: &PlanarIntrinsicsProblem,
    init_camera: &PinholeCamera,
    init_poses: &[Iso3],
    opts: &SolveOptions,
) -> PlanarRefinement {
    debug_assert_eq!(init_poses.len(), problem.num_views());

    let x0 = pack_params(init_camera, init_poses);
    let (x_opt, report) = backend.solve(problem, x0, opts);
    let (camera, poses) = problem.decode(&x_opt);

    PlanarRefinement {
        camera,
        poses,
        report,
    }
}

/// Root-mean-square reprojection error over all views and points, in pixels.
pub fn rms_reproj_error(
    views: &CorrespondenceSet,
    camera: &PinholeCamera,
    poses: &[Iso3],
) -> Real {
    let mut sum_sq = 0.0;
    let mut count = 0usize;

    for (view, pose) in views.views.iter().zip(poses.iter()) {
        for (pw, meas) in view.points_3d.iter().zip(view.points_2d.iter()) {
            let p_cam = pose.transform_point(pw);
            if let Some(proj) = camera.project_point(&p_cam) {
                let dx = meas.x - proj.x;
                let dy = meas.y - proj.y;
                sum_sq += dx * dx + dy * dy;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Real::INFINITY;
    }
    (sum_sq / count as Real).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmBackend;
    use chesscal_core::{synthetic, PatternGeometry};

    fn ground_truth_camera() -> PinholeCamera {
        PinholeCamera::new(
            FxFyCxCy {
                fx: 800.0,
                fy: 780.0,
                cx: 640.0,
                cy: 360.0,
            },
            BrownConrady5 {
                k1: -0.1,
                k2: 0.01,
                p1: 0.001,
                p2: -0.001,
                k3: 0.0,
            },
        )
    }

    #[test]
    fn pack_decode_roundtrip() {
        let cam = ground_truth_camera();
        let poses = synthetic::varied_poses(3, 0.8, 0.1);
        let x = pack_params(&cam, &poses);
        assert_eq!(x.len(), CAMERA_PARAMS + 18);

        let (cam2, poses2) = decode_params(3, &x);
        assert_eq!(cam2.intrinsics.fx, cam.intrinsics.fx);
        assert_eq!(cam2.distortion.k3, cam.distortion.k3);
        for (a, b) in poses.iter().zip(poses2.iter()) {
            assert!((a.translation.vector - b.translation.vector).norm() < 1e-12);
            assert!(a.rotation.angle_to(&b.rotation) < 1e-12);
        }
    }

    #[test]
    fn refinement_recovers_ground_truth_from_perturbed_start() {
        let cam_gt = ground_truth_camera();
        let geom = PatternGeometry::new(6, 4, 0.03);
        let poses_gt = synthetic::varied_poses(4, 0.7, 0.1);
        let views = synthetic::project_views(&cam_gt, &geom, &poses_gt).unwrap();

        let problem = PlanarIntrinsicsProblem::new(CorrespondenceSet { views });

        let cam_init = PinholeCamera::new(
            FxFyCxCy {
                fx: 760.0,
                fy: 740.0,
                cx: 630.0,
                cy: 350.0,
            },
            BrownConrady5::default(),
        );

        let result = refine_planar_intrinsics(
            &LmBackend,
            &problem,
            &cam_init,
            &poses_gt,
            &SolveOptions::default(),
        );

        assert!(result.report.converged, "{:?}", result.report);
        assert!(
            result.report.final_cost < 1e-8,
            "final cost too high: {}",
            result.report.final_cost
        );

        let k = result.camera.intrinsics;
        assert!((k.fx - 800.0).abs() < 1.0, "fx = {}", k.fx);
        assert!((k.fy - 780.0).abs() < 1.0, "fy = {}", k.fy);
        assert!((k.cx - 640.0).abs() < 1.0, "cx = {}", k.cx);
        assert!((k.cy - 360.0).abs() < 1.0, "cy = {}", k.cy);

        let rms = rms_reproj_error(problem.views(), &result.camera, &result.poses);
        assert!(rms < 1e-4, "rms = {rms}");
    }
}
