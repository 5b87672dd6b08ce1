//! On-disk calibration file schema.
//!
//! The format is a small YAML document holding the 3×3 camera matrix as a
//! row-major nested list and the distortion coefficients as a flat vector in
//! `[k1, k2, p1, p2, k3]` order. Round-trips preserve full `f64` precision.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{BrownConrady5, FxFyCxCy, PinholeCamera, Real};

/// Serializable camera calibration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// Row-major 3×3 intrinsic matrix.
    pub camera_matrix: [[Real; 3]; 3],
    /// Distortion coefficients `[k1, k2, p1, p2, k3]`.
    pub distortion_coefficients: [Real; 5],
}

impl CameraCalibration {
    pub fn from_camera(camera: &PinholeCamera) -> Self {
        let k = &camera.intrinsics;
        Self {
            camera_matrix: [
                [k.fx, 0.0, k.cx],
                [0.0, k.fy, k.cy],
                [0.0, 0.0, 1.0],
            ],
            distortion_coefficients: camera.distortion.as_array(),
        }
    }

    pub fn to_camera(&self) -> PinholeCamera {
        let m = &self.camera_matrix;
        PinholeCamera::new(
            FxFyCxCy {
                fx: m[0][0],
                fy: m[1][1],
                cx: m[0][2],
                cy: m[1][2],
            },
            BrownConrady5::from_array(self.distortion_coefficients),
        )
    }

    /// Write the calibration as YAML.
    pub fn save_yaml(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .with_context(|| format!("failed to serialize calibration for {}", path.display()))?;
        fs::write(path, yaml)
            .with_context(|| format!("failed to write calibration file {}", path.display()))
    }

    /// Read a calibration previously written by [`CameraCalibration::save_yaml`].
    pub fn load_yaml(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration file {}", path.display()))?;
        serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse calibration file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CameraCalibration {
        CameraCalibration {
            camera_matrix: [
                [812.3456789012345, 0.0, 321.98765432101234],
                [0.0, 798.7654321098765, 239.12345678901234],
                [0.0, 0.0, 1.0],
            ],
            distortion_coefficients: [
                -0.123456789012345,
                0.0123456789,
                0.000123456789,
                -0.000987654321,
                0.00012345,
            ],
        }
    }

    #[test]
    fn yaml_roundtrip_preserves_precision() {
        let calib = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam3_calibration.yaml");

        calib.save_yaml(&path).unwrap();
        let loaded = CameraCalibration::load_yaml(&path).unwrap();

        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(loaded.camera_matrix[r][c], calib.camera_matrix[r][c]);
            }
        }
        for i in 0..5 {
            assert_eq!(
                loaded.distortion_coefficients[i],
                calib.distortion_coefficients[i]
            );
        }
    }

    #[test]
    fn camera_conversion_roundtrip() {
        let calib = sample();
        let cam = calib.to_camera();
        let back = CameraCalibration::from_camera(&cam);
        assert_eq!(back, calib);
    }
}
