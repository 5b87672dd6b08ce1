//! Stereo chessboard calibration pipeline, one subcommand per stage.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chesscal_core::{CameraCalibration, PatternGeometry};
use chesscal_detect::{DetectorParams, GrayImage};
use chesscal_pipeline::{
    calibrate_camera, list_camera_images, load_pairs, save_pairs, select_stereo_pairs,
    side_by_side, undistort_image,
};
use clap::{Args, Parser, Subcommand};
use log::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Stereo chessboard camera calibration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct BoardArgs {
    /// Interior corners per row.
    #[arg(long, default_value_t = 10)]
    cols: usize,

    /// Interior corner rows.
    #[arg(long, default_value_t = 7)]
    rows: usize,

    /// Square edge length in target units; only extrinsic scale depends
    /// on it.
    #[arg(long, default_value_t = 1.0)]
    square_size: f64,
}

impl BoardArgs {
    fn geometry(&self) -> PatternGeometry {
        PatternGeometry::new(self.cols, self.rows, self.square_size)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find captures where the board is visible on both cameras.
    SelectPairs {
        /// Directory of `<index>_cam<N>.png` captures.
        #[arg(long)]
        images: PathBuf,

        /// Camera number of the left images.
        #[arg(long, default_value_t = 1)]
        left_cam: usize,

        /// Camera number of the right images.
        #[arg(long, default_value_t = 2)]
        right_cam: usize,

        /// Output pair-list JSON.
        #[arg(long, default_value = "stereo_pairs.json")]
        output: PathBuf,

        #[command(flatten)]
        board: BoardArgs,
    },

    /// Calibrate both cameras independently over the selected pairs.
    Calibrate {
        /// Pair-list JSON produced by `select-pairs`.
        #[arg(long, default_value = "stereo_pairs.json")]
        pairs: PathBuf,

        /// Output YAML for the left camera.
        #[arg(long, default_value = "left_calibration.yaml")]
        left_output: PathBuf,

        /// Output YAML for the right camera.
        #[arg(long, default_value = "right_calibration.yaml")]
        right_output: PathBuf,

        #[command(flatten)]
        board: BoardArgs,
    },

    /// Undistort one image through a saved calibration.
    Undistort {
        /// Input image.
        #[arg(long)]
        image: PathBuf,

        /// Calibration YAML produced by `calibrate`.
        #[arg(long)]
        calibration: PathBuf,

        /// Free-scaling parameter: 0 crops to valid pixels, 1 retains all
        /// source pixels.
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,

        /// Output image path.
        #[arg(long)]
        output: PathBuf,

        /// Also write an original/undistorted comparison image here.
        #[arg(long)]
        compare: Option<PathBuf>,

        /// Downscale factor for the comparison image.
        #[arg(long, default_value_t = 0.5)]
        compare_scale: f64,
    },
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    match Cli::parse().command {
        Command::SelectPairs {
            images,
            left_cam,
            right_cam,
            output,
            board,
        } => select_pairs_cmd(&images, left_cam, right_cam, &output, &board.geometry()),
        Command::Calibrate {
            pairs,
            left_output,
            right_output,
            board,
        } => calibrate_cmd(&pairs, &left_output, &right_output, &board.geometry()),
        Command::Undistort {
            image,
            calibration,
            alpha,
            output,
            compare,
            compare_scale,
        } => undistort_cmd(
            &image,
            &calibration,
            alpha,
            &output,
            compare.as_deref(),
            compare_scale,
        ),
    }
}

fn select_pairs_cmd(
    images: &Path,
    left_cam: usize,
    right_cam: usize,
    output: &Path,
    geometry: &PatternGeometry,
) -> Result<()> {
    let left = list_camera_images(images, left_cam)?;
    let right = list_camera_images(images, right_cam)?;
    ensure!(
        !left.is_empty() || !right.is_empty(),
        "no captures for cameras {left_cam}/{right_cam} in {}",
        images.display()
    );

    let pairs = select_stereo_pairs(&left, &right, geometry, &DetectorParams::default());
    save_pairs(&pairs, output)?;
    info!("wrote {} pairs to {}", pairs.len(), output.display());
    Ok(())
}

fn calibrate_cmd(
    pairs_path: &Path,
    left_output: &Path,
    right_output: &Path,
    geometry: &PatternGeometry,
) -> Result<()> {
    let pairs = load_pairs(pairs_path)?;
    ensure!(!pairs.is_empty(), "empty pair list in {}", pairs_path.display());

    let left_paths: Vec<PathBuf> = pairs.iter().map(|p| p.left.clone()).collect();
    let right_paths: Vec<PathBuf> = pairs.iter().map(|p| p.right.clone()).collect();

    let params = DetectorParams::default();
    let left = calibrate_camera(&left_paths, geometry, &params)
        .context("left camera calibration failed")?;
    let right = calibrate_camera(&right_paths, geometry, &params)
        .context("right camera calibration failed")?;

    let (lk, rk) = (&left.camera.intrinsics, &right.camera.intrinsics);
    info!(
        "left:  fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}",
        lk.fx, lk.fy, lk.cx, lk.cy, left.rms_reproj_error
    );
    info!(
        "right: fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}",
        rk.fx, rk.fy, rk.cx, rk.cy, right.rms_reproj_error
    );
    info!(
        "focal length difference: dfx={:.2} dfy={:.2}",
        (lk.fx - rk.fx).abs(),
        (lk.fy - rk.fy).abs()
    );

    CameraCalibration::from_camera(&left.camera).save_yaml(left_output)?;
    CameraCalibration::from_camera(&right.camera).save_yaml(right_output)?;
    info!(
        "wrote {} and {}",
        left_output.display(),
        right_output.display()
    );
    Ok(())
}

fn undistort_cmd(
    image: &Path,
    calibration: &Path,
    alpha: f64,
    output: &Path,
    compare: Option<&Path>,
    compare_scale: f64,
) -> Result<()> {
    let camera = CameraCalibration::load_yaml(calibration)?.to_camera();
    let img = GrayImage::open(image)?;

    let out = undistort_image(&img, &camera, alpha);
    out.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {}", output.display());

    if let Some(compare_path) = compare {
        let stacked = side_by_side(&img, &out, compare_scale);
        stacked
            .save(compare_path)
            .with_context(|| format!("failed to write {}", compare_path.display()))?;
        info!("wrote comparison to {}", compare_path.display());
    }
    Ok(())
}
