//! End-to-end calibration stages for stereo chessboard captures.
//!
//! A run proceeds in three stages, each usable on its own:
//! 1. pair selection ([`pairs`]): detect the board on synchronized
//!    left/right captures and keep the indices where both succeed,
//! 2. per-camera calibration ([`solver`]): linear bootstrap plus joint
//!    nonlinear refinement over all kept views of one camera,
//! 3. undistortion ([`undistort`]): remap images through the solved model.

pub mod compare;
pub mod dataset;
pub mod pairs;
pub mod persist;
pub mod solver;
pub mod undistort;

pub use compare::side_by_side;
pub use dataset::list_camera_images;
pub use pairs::{select_pairs_with, select_stereo_pairs};
pub use persist::{load_pairs, save_pairs};
pub use solver::{calibrate_camera, solve_camera, CalibError, CameraSolveResult};
pub use undistort::{optimal_new_intrinsics, undistort_image};
