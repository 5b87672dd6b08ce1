//! Linear (closed-form) calibration building blocks.
//!
//! These produce the initial estimate handed to the nonlinear refinement:
//! per-view plane homographies, Zhang's intrinsics from the homography set,
//! and the homography decomposition into per-view poses.

pub mod homography;
pub mod planar_pose;
pub mod zhang;

pub use homography::{dlt_homography, HomographyError};
pub use planar_pose::{pose_from_homography, PoseError};
pub use zhang::{intrinsics_from_homographies, ZhangError};
