//! Before/after comparison rendering.

use chesscal_core::Real;
use chesscal_detect::GrayImage;

/// Stack two images horizontally, optionally downscaled.
///
/// `scale` in `(0, 1]` shrinks both images (bilinear) before stacking;
/// mismatched heights are padded with black at the bottom.
pub fn side_by_side(left: &GrayImage, right: &GrayImage, scale: Real) -> GrayImage {
    let scale = if scale > 0.0 && scale <= 1.0 { scale } else { 1.0 };
    let l = resize(left, scale);
    let r = resize(right, scale);

    let height = l.height().max(r.height());
    let mut out = GrayImage::new(l.width() + r.width(), height);
    blit(&mut out, &l, 0);
    blit(&mut out, &r, l.width());
    out
}

fn resize(img: &GrayImage, scale: Real) -> GrayImage {
    if scale == 1.0 {
        return img.clone();
    }
    let w = ((img.width() as Real * scale).round() as usize).max(1);
    let h = ((img.height() as Real * scale).round() as usize).max(1);
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let sx = x as Real / scale;
            let sy = y as Real / scale;
            out.set(x, y, img.sample_bilinear(sx, sy) as f32);
        }
    }
    out
}

fn blit(dst: &mut GrayImage, src: &GrayImage, x_off: usize) {
    for y in 0..src.height() {
        for x in 0..src.width() {
            dst.set(x + x_off, y, src.get(x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_full_size_images() {
        let mut a = GrayImage::new(10, 8);
        let mut b = GrayImage::new(12, 6);
        a.set(3, 2, 1.0);
        b.set(5, 4, 0.5);

        let out = side_by_side(&a, &b, 1.0);
        assert_eq!(out.dimensions(), (22, 8));
        assert_eq!(out.get(3, 2), 1.0);
        assert_eq!(out.get(15, 4), 0.5);
        // Padded region under the shorter image stays black.
        assert_eq!(out.get(15, 7), 0.0);
    }

    #[test]
    fn half_scale_halves_the_dimensions() {
        let a = GrayImage::new(20, 10);
        let b = GrayImage::new(20, 10);
        let out = side_by_side(&a, &b, 0.5);
        assert_eq!(out.dimensions(), (20, 5));
    }

    #[test]
    fn bogus_scale_falls_back_to_full_size() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(4, 4);
        assert_eq!(side_by_side(&a, &b, 0.0).dimensions(), (8, 4));
        assert_eq!(side_by_side(&a, &b, -2.0).dimensions(), (8, 4));
    }
}
