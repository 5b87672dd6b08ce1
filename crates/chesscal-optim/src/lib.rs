//! Nonlinear least-squares refinement for planar camera calibration.
//!
//! The solver is split into a generic dense problem trait ([`NllsProblem`]),
//! a Levenberg-Marquardt backend wrapping the `levenberg-marquardt` crate,
//! and the concrete planar intrinsics bundle problem that jointly refines
//! intrinsics, distortion, and per-view poses.

pub mod backend_lm;
pub mod planar_intrinsics;
pub mod problem;

pub use backend_lm::LmBackend;
pub use planar_intrinsics::{
    pack_params, refine_planar_intrinsics, rms_reproj_error, PlanarIntrinsicsProblem,
    PlanarRefinement,
};
pub use problem::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
