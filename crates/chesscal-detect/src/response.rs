//! Ring-based X-corner response (ChESS-style).
//!
//! Sixteen samples on a circle around each pixel feed three terms:
//! a sum response that peaks where diagonally opposite samples agree and
//! quadrature samples disagree (the four-quadrant pattern of a chessboard
//! intersection), a diff response that penalizes plain edges, and a mean
//! response that penalizes junctions against a uniform background. L- and
//! T-junctions at the board margin score near zero, so only interior
//! corners survive thresholding.

use crate::gray::GrayImage;

/// 16-point ring offsets for radius 5, ordered counter-clockwise.
const RING_R5: [(i64, i64); 16] = [
    (5, 0),
    (5, 2),
    (4, 4),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-4, 4),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-4, -4),
    (-2, -5),
    (0, -5),
    (2, -5),
    (4, -4),
    (5, -2),
];

/// Corner response map in row-major layout.
#[derive(Debug, Clone)]
pub struct ResponseMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::MIN, f32::max)
    }
}

/// Compute the ring response at every pixel far enough from the border.
pub fn corner_response(img: &GrayImage) -> ResponseMap {
    let (w, h) = img.dimensions();
    let mut data = vec![0.0f32; w * h];
    let r = 5i64;

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            if x < r || y < r || x >= w as i64 - r || y >= h as i64 - r {
                continue;
            }

            let mut s = [0.0f32; 16];
            for (i, (dx, dy)) in RING_R5.iter().enumerate() {
                s[i] = img.get((x + dx) as usize, (y + dy) as usize);
            }

            let mut sum_resp = 0.0f32;
            for n in 0..4 {
                sum_resp += (s[n] - s[n + 4] + s[n + 8] - s[n + 12]).abs();
            }

            let mut diff_resp = 0.0f32;
            for n in 0..8 {
                diff_resp += (s[n] - s[n + 8]).abs();
            }

            let ring_sum: f32 = s.iter().sum();
            let mut local = 0.0f32;
            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    local += img.get((x + dx) as usize, (y + dy) as usize);
                }
            }
            let mean_resp = (ring_sum - 16.0 * local / 9.0).abs();

            data[(y * w as i64 + x) as usize] = sum_resp - diff_resp - mean_resp;
        }
    }

    ResponseMap {
        width: w,
        height: h,
        data,
    }
}

/// Non-maximum suppression: local maxima above `threshold_rel * max`.
///
/// Returned as integer pixel coordinates, unordered.
pub fn find_candidates(resp: &ResponseMap, nms_radius: usize, threshold_rel: f32) -> Vec<(usize, usize)> {
    let max = resp.max_value();
    if !(max > 0.0) {
        return Vec::new();
    }
    let threshold = threshold_rel * max;
    let r = nms_radius as i64;

    let mut out = Vec::new();
    for y in 0..resp.height {
        for x in 0..resp.width {
            let v = resp.at(x, y);
            if v < threshold {
                continue;
            }
            let mut is_max = true;
            'scan: for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let xn = x as i64 + dx;
                    let yn = y as i64 + dy;
                    if xn < 0 || yn < 0 || xn >= resp.width as i64 || yn >= resp.height as i64 {
                        continue;
                    }
                    let vn = resp.at(xn as usize, yn as usize);
                    // Strict comparison on one side so plateaus yield one winner.
                    if vn > v || (vn == v && (dy, dx) < (0, 0)) {
                        is_max = false;
                        break 'scan;
                    }
                }
            }
            if is_max {
                out.push((x, y));
            }
        }
    }
    out
}
