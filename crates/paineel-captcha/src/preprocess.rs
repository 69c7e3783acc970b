//! Image cleanup ahead of local OCR.
//!
//! Grayscale, stretch the histogram, binarize at a fixed threshold and
//! knock out speckle noise with a 3x3 median.

use image::{DynamicImage, GrayImage, Luma};

/// Full pipeline applied before handing an image to the OCR engine.
pub fn prepare(img: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = img.to_luma8();
    let stretched = autocontrast(&gray);
    let binary = binarize(&stretched, threshold);
    median3(&binary)
}

/// Linearly stretch intensities so the darkest pixel maps to 0 and the
/// brightest to 255. Uniform images are returned unchanged.
pub fn autocontrast(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if hi <= lo {
        return img.clone();
    }

    let scale = 255.0 / f32::from(hi - lo);
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let mapped = ((value as f32 - f32::from(lo)) * scale).clamp(0.0, 255.0) as u8;
        *slot = mapped;
    }

    let mut out = img.clone();
    for p in out.pixels_mut() {
        p[0] = lut[usize::from(p[0])];
    }
    out
}

/// Pixels strictly above `threshold` become white, the rest black.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p[0] = if p[0] > threshold { 255 } else { 0 };
    }
    out
}

/// 3x3 median filter with edge pixels replicated.
pub fn median3(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut window = [0u8; 9];
        let mut n = 0;
        for dy in [-1i64, 0, 1] {
            for dx in [-1i64, 0, 1] {
                let sx = clamp_coord(i64::from(x) + dx, width);
                let sy = clamp_coord(i64::from(y) + dy, height);
                window[n] = img.get_pixel(sx, sy)[0];
                n += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}

fn clamp_coord(v: i64, len: u32) -> u32 {
    let max = i64::from(len) - 1;
    // in range after the clamp
    u32::try_from(v.clamp(0, max)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from(width: u32, height: u32, values: &[u8]) -> GrayImage {
        GrayImage::from_raw(width, height, values.to_vec()).unwrap()
    }

    #[test]
    fn test_autocontrast_stretches_range() {
        let img = image_from(3, 1, &[100, 150, 200]);
        let out = autocontrast(&img);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
        assert_eq!(out.get_pixel(1, 0)[0], 127);
    }

    #[test]
    fn test_autocontrast_uniform_image_unchanged() {
        let img = image_from(2, 2, &[90, 90, 90, 90]);
        assert_eq!(autocontrast(&img), img);
    }

    #[test]
    fn test_binarize_threshold_is_exclusive() {
        let img = image_from(3, 1, &[129, 130, 131]);
        let out = binarize(&img, 130);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn test_median_removes_isolated_speck() {
        let mut values = vec![255u8; 25];
        values[12] = 0; // center of a 5x5 white square
        let img = image_from(5, 5, &values);
        let out = median3(&img);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_prepare_outputs_only_black_and_white() {
        let img = DynamicImage::ImageLuma8(image_from(4, 1, &[10, 60, 180, 240]));
        let out = prepare(&img, 130);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.dimensions(), (4, 1));
    }
}
