//! Pair-list persistence.
//!
//! The selected stereo pairs are written as JSON so later stages (and other
//! tools) can consume the list without re-running detection.

use std::path::Path;

use anyhow::{Context, Result};
use chesscal_core::StereoPair;

pub fn save_pairs(pairs: &[StereoPair], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(pairs).context("failed to serialize pair list")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write pair list to {}", path.display()))
}

pub fn load_pairs(path: &Path) -> Result<Vec<StereoPair>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pair list from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("malformed pair list in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn pair_list_roundtrip() {
        let pairs = vec![
            StereoPair {
                left: PathBuf::from("captures/1_cam1.png"),
                right: PathBuf::from("captures/1_cam2.png"),
            },
            StereoPair {
                left: PathBuf::from("captures/4_cam1.png"),
                right: PathBuf::from("captures/4_cam2.png"),
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.json");
        save_pairs(&pairs, &path).unwrap();
        assert_eq!(load_pairs(&path).unwrap(), pairs);
    }

    #[test]
    fn malformed_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_pairs(&path).unwrap_err();
        assert!(format!("{err:#}").contains("pairs.json"));
    }
}
