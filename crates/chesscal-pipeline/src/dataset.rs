//! Capture-set enumeration by filename convention.
//!
//! Stereo captures are stored flat as `<index>_cam<N>.png`, where `index`
//! is the synchronization counter and `N` the camera number. Listing a
//! camera sorts by the integer prefix, so position i in the left and right
//! lists refers to the same capture instant.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// List the images of one camera in capture order.
///
/// Files that do not match the `<index>_cam<N>.png` convention for the
/// requested camera are ignored.
pub fn list_camera_images(dir: &Path, cam_index: usize) -> Result<Vec<PathBuf>> {
    let suffix = format!("_cam{cam_index}.png");

    let mut indexed: Vec<(u64, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list image directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(prefix) = name.strip_suffix(&suffix) else {
            continue;
        };
        let Ok(index) = prefix.parse::<u64>() else {
            debug!("skipping {name}: non-numeric capture index");
            continue;
        };
        indexed.push((index, path));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn sorts_by_integer_prefix_not_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10_cam1.png", "2_cam1.png", "1_cam1.png", "1_cam2.png"] {
            touch(dir.path(), name);
        }

        let listed = list_camera_images(dir.path(), 1).unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["1_cam1.png", "2_cam1.png", "10_cam1.png"]);
    }

    #[test]
    fn ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["3_cam2.png", "notes.txt", "x_cam2.png", "7_cam2.jpg"] {
            touch(dir.path(), name);
        }
        let listed = list_camera_images(dir.path(), 2).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].ends_with("3_cam2.png"));
    }

    #[test]
    fn missing_directory_reports_the_path() {
        let err = list_camera_images(Path::new("/nonexistent/captures"), 1).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/captures"));
    }
}
