//! Core math and data types for `chesscal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the planar chessboard target geometry ([`PatternGeometry`]),
//! - the pinhole camera model with Brown-Conrady distortion
//!   ([`PinholeCamera`]),
//! - correspondence containers handed to the calibration solver,
//! - the on-disk calibration file schema ([`CameraCalibration`]).
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ pinhole(point in camera frame)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Planar chessboard target geometry.
pub mod pattern;
/// Pinhole camera model with radial-tangential distortion.
pub mod camera;
/// Correspondence containers and stereo pair records.
pub mod correspondence;
/// YAML calibration file schema and round-trip helpers.
pub mod calibfile;
/// Synthetic target/pose generators for tests and examples.
pub mod synthetic;

pub use calibfile::*;
pub use camera::*;
pub use correspondence::*;
pub use math::*;
pub use pattern::*;
