//! Per-pixel tone adjustments: brightness, contrast, saturation.
//!
//! Brightness is a plain multiplier. Contrast scales each channel's
//! distance from mid-gray (127.5). Saturation scales each channel's
//! distance from the pixel's luminance, so a gray pixel stays gray.
//!
//! Every function clamps its factor to the band it is given, writes
//! rounded samples clamped to `0..=255`, and leaves alpha alone.

use std::ops::RangeInclusive;

use crate::raster;
use crate::types::RgbaImage;

/// Rec. 601 luma weights for R, G, B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Luminance of an RGB triple.
#[must_use]
pub fn luminance([r, g, b]: [f32; 3]) -> f32 {
    LUMA_WEIGHTS[2].mul_add(b, LUMA_WEIGHTS[0].mul_add(r, LUMA_WEIGHTS[1] * g))
}

/// Clamp `factor` into `band`.
#[must_use]
pub fn clamp_factor(factor: f32, band: &RangeInclusive<f32>) -> f32 {
    factor.clamp(*band.start(), *band.end())
}

/// Contrast around mid-gray on a single channel value.
fn contrast_channel(v: f32, contrast: f32) -> f32 {
    ((v / 255.0 - 0.5) * contrast + 0.5) * 255.0
}

/// Multiply R, G, B by `brightness`, clamped to `band`.
pub fn apply_brightness(image: &mut RgbaImage, brightness: f32, band: &RangeInclusive<f32>) {
    let b = clamp_factor(brightness, band);
    raster::map_rgb(image, |rgb| rgb.map(|v| v * b));
}

/// Scale R, G, B away from mid-gray by `contrast`, clamped to `band`.
pub fn apply_contrast(image: &mut RgbaImage, contrast: f32, band: &RangeInclusive<f32>) {
    let c = clamp_factor(contrast, band);
    raster::map_rgb(image, |rgb| rgb.map(|v| contrast_channel(v, c)));
}

/// Brightness then contrast in a single pass, without intermediate
/// rounding. Both factors are clamped to `band`.
pub fn apply_brightness_contrast(
    image: &mut RgbaImage,
    brightness: f32,
    contrast: f32,
    band: &RangeInclusive<f32>,
) {
    let b = clamp_factor(brightness, band);
    let c = clamp_factor(contrast, band);
    raster::map_rgb(image, |rgb| rgb.map(|v| contrast_channel(v * b, c)));
}

/// Move each channel toward (`< 1`) or away from (`> 1`) the pixel's
/// luminance. The factor is clamped to `band`.
pub fn apply_saturation(image: &mut RgbaImage, saturation: f32, band: &RangeInclusive<f32>) {
    let s = clamp_factor(saturation, band);
    raster::map_rgb(image, |rgb| {
        let lum = luminance(rgb);
        rgb.map(|v| s.mul_add(v - lum, lum))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: RangeInclusive<f32> = 0.0..=4.0;

    fn single(r: u8, g: u8, b: u8) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, image::Rgba([r, g, b, 128]))
    }

    #[test]
    fn luminance_of_gray_is_gray() {
        assert!((luminance([90.0, 90.0, 90.0]) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let mut img = single(100, 200, 0);
        apply_brightness(&mut img, 1.5, &WIDE);
        assert_eq!(img.get_pixel(0, 0).0, [150, 255, 0, 128]);
    }

    #[test]
    fn brightness_band_limits_factor() {
        let mut img = single(100, 100, 100);
        apply_brightness(&mut img, 3.0, &(0.8..=1.3));
        assert_eq!(img.get_pixel(0, 0).0, [130, 130, 130, 128]);
    }

    #[test]
    fn contrast_pushes_away_from_mid_gray() {
        let mut img = single(64, 128, 250);
        apply_contrast(&mut img, 1.5, &WIDE);
        let p = img.get_pixel(0, 0).0;
        assert_eq!(p[0], 32, "64 -> 32.25");
        assert_eq!(p[1], 128, "128 -> 128.25");
        assert_eq!(p[2], 255, "250 -> 311.25 clamps");
        assert_eq!(p[3], 128);
    }

    #[test]
    fn neutral_contrast_is_identity() {
        let mut img = RgbaImage::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 16 + y) as u8;
            image::Rgba([v, 255 - v, v / 2, 255])
        });
        let before = img.clone();
        apply_contrast(&mut img, 1.0, &WIDE);
        assert_eq!(img, before);
    }

    #[test]
    fn combined_pass_matches_formula() {
        let mut img = single(100, 0, 255);
        apply_brightness_contrast(&mut img, 1.2, 1.5, &(0.5..=2.0));
        // 100 * 1.2 = 120 -> ((120/255 - 0.5) * 1.5 + 0.5) * 255 = 116.25
        let p = img.get_pixel(0, 0).0;
        assert_eq!(p[0], 116);
        assert_eq!(p[1], 0);
        assert_eq!(p[2], 255);
    }

    #[test]
    fn saturation_zero_produces_gray() {
        let mut img = single(200, 100, 50);
        apply_saturation(&mut img, 0.0, &(0.0..=2.0));
        let p = img.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn saturation_keeps_gray_pixels_gray() {
        let mut img = single(77, 77, 77);
        apply_saturation(&mut img, 2.0, &(0.0..=2.0));
        assert_eq!(img.get_pixel(0, 0).0, [77, 77, 77, 128]);
    }

    #[test]
    fn saturation_band_caps_boost() {
        let mut capped = single(200, 100, 50);
        let mut at_cap = capped.clone();
        apply_saturation(&mut capped, 9.0, &(0.0..=2.0));
        apply_saturation(&mut at_cap, 2.0, &(0.0..=2.0));
        assert_eq!(capped, at_cap);
    }
}
