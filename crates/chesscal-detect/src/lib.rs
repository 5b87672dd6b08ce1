//! Chessboard corner detection and sub-pixel refinement.
//!
//! Detection runs in four stages:
//! 1. a ring-based corner response over the grayscale image
//!    ([`response`]), strong at X-corners (four-square intersections) and
//!    suppressed at edges and L-junctions,
//! 2. non-maximum suppression into candidate corners,
//! 3. lattice grouping ([`lattice`]) that snaps candidates onto an integer
//!    grid and orders them canonically (column index fastest, columns
//!    toward +x, rows toward +y),
//! 4. optional gradient-based sub-pixel refinement ([`subpix`]).
//!
//! Each detection is a pure function of one image; batches can be fanned
//! out across threads without shared state.

pub mod detector;
pub mod gray;
pub mod lattice;
pub mod render;
pub mod response;
pub mod subpix;

pub use detector::{
    detect_and_refine, detect_corners, detect_in_file, DetectError, DetectorParams,
};
pub use gray::GrayImage;
pub use lattice::GridError;
pub use subpix::{refine_corner, SubpixCriteria};
