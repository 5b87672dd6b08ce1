//! Owned grayscale image buffer used by the detection and remap stages.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: image::ImageError,
    },
}

/// Row-major grayscale image with `f32` intensities in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), width * height, "buffer size mismatch");
        Self {
            width,
            height,
            data,
        }
    }

    /// Decode an image file and convert to grayscale.
    pub fn open(path: &Path) -> Result<Self, ImageLoadError> {
        let img = image::open(path)
            .map_err(|source| ImageLoadError::Open {
                path: path.display().to_string(),
                source,
            })?
            .into_luma8();
        let width = img.width() as usize;
        let height = img.height() as usize;
        let data = img.into_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Ok(Self::from_vec(width, height, data))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }

    /// Pixel value with border clamping for out-of-range coordinates.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let xc = x.clamp(0, self.width as i64 - 1) as usize;
        let yc = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(xc, yc)
    }

    /// Bilinear sample at a fractional position, border-clamped.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);

        let v00 = self.get_clamped(xi, yi) as f64;
        let v10 = self.get_clamped(xi + 1, yi) as f64;
        let v01 = self.get_clamped(xi, yi + 1) as f64;
        let v11 = self.get_clamped(xi + 1, yi + 1) as f64;

        (v00 * (1.0 - fx) + v10 * fx) * (1.0 - fy) + (v01 * (1.0 - fx) + v11 * fx) * fy
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Convert to an 8-bit buffer for encoding, clamping to `[0, 255]`.
    pub fn to_luma8(&self) -> image::GrayImage {
        let mut out = image::GrayImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let v = (self.get(x, y) * 255.0).clamp(0.0, 255.0).round() as u8;
                out.put_pixel(x as u32, y as u32, image::Luma([v]));
            }
        }
        out
    }

    /// Encode to disk (format chosen from the file extension).
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.to_luma8().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let mut img = GrayImage::new(2, 1);
        img.set(0, 0, 0.0);
        img.set(1, 0, 1.0);
        assert!((img.sample_bilinear(0.25, 0.0) - 0.25).abs() < 1e-6);
        assert!((img.sample_bilinear(0.5, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sampling_clamps_at_borders() {
        let mut img = GrayImage::new(2, 2);
        img.set(0, 0, 0.5);
        assert!((img.sample_bilinear(-3.0, -3.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn file_roundtrip() {
        let mut img = GrayImage::new(4, 3);
        img.set(2, 1, 1.0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.png");
        img.save(&path).unwrap();

        let loaded = GrayImage::open(&path).unwrap();
        assert_eq!(loaded.dimensions(), (4, 3));
        assert!((loaded.get(2, 1) - 1.0).abs() < 1e-2);
        assert!(loaded.get(0, 0) < 1e-2);
    }
}
