//! 3x3 bilateral filtering.
//!
//! Each interior sample is replaced by a weighted mean of its 3x3
//! neighborhood in the same channel. A neighbor's weight falls off with
//! its distance from the center (spatial term) and with the difference
//! between its value and the center value (range term):
//!
//! ```text
//! w = exp(-d² / (2·σs²)) · exp(-Δ² / (2·σc²))
//! ```
//!
//! Neighbors across a strong edge get a near-zero range weight, so flat
//! regions are smoothed while edges stay sharp.
//!
//! Used for anime-mode smoothing after nearest-neighbor upscaling and for
//! both denoise passes in the enhancer.

use crate::raster::{self, Window};
use crate::types::RgbaImage;

/// Parameters for one bilateral pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    /// Spatial standard deviation in pixels. `None` weights all nine
    /// window positions equally (range-only filtering).
    pub spatial_sigma: Option<f32>,
    /// Range standard deviation in sample units.
    pub color_sigma: f32,
    /// Share of the original sample kept in the output, `0.0..=1.0`.
    /// `0.0` replaces the sample with the filtered mean.
    pub keep_original: f32,
}

/// Edge-preserving smoothing applied after nearest-neighbor upscaling.
pub const EDGE_SMOOTH: BilateralParams = BilateralParams {
    spatial_sigma: Some(0.5),
    color_sigma: 20.0,
    keep_original: 0.0,
};

/// Conservative-mode denoise: narrow range, blended 70/30 with the
/// original sample.
pub const MILD_DENOISE: BilateralParams = BilateralParams {
    spatial_sigma: None,
    color_sigma: 10.0,
    keep_original: 0.7,
};

/// Standard-mode denoise: wider range, full replacement.
pub const FULL_DENOISE: BilateralParams = BilateralParams {
    spatial_sigma: None,
    color_sigma: 25.0,
    keep_original: 0.0,
};

/// Precomputed spatial weights for the 3x3 window, row-major.
#[allow(clippy::cast_precision_loss)]
fn spatial_weights(sigma: Option<f32>) -> [f32; 9] {
    let Some(sigma) = sigma.filter(|s| *s > 0.0) else {
        return [1.0; 9];
    };
    let denom = 2.0 * sigma * sigma;
    std::array::from_fn(|i| {
        let dx = (i % 3) as f32 - 1.0;
        let dy = (i / 3) as f32 - 1.0;
        (-(dx.mul_add(dx, dy * dy)) / denom).exp()
    })
}

/// Weighted mean of one window.
fn filtered_mean(window: &Window<'_>, spatial: &[f32; 9], range_denom: f32) -> f32 {
    let center = window.center();
    let mut sum = 0.0_f32;
    let mut weight_sum = 0.0_f32;
    for (kx, ky, value) in window.iter() {
        let diff = value - center;
        let weight = spatial[ky * 3 + kx] * (-(diff * diff) / range_denom).exp();
        sum = value.mul_add(weight, sum);
        weight_sum += weight;
    }
    // The center always contributes a positive weight.
    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        center
    }
}

/// Apply one bilateral pass to the interior R, G, B samples in place.
///
/// Alpha and the one-pixel border are left untouched. A non-positive
/// `color_sigma` leaves the image unchanged.
pub fn bilateral_3x3(image: &mut RgbaImage, params: BilateralParams) {
    if params.color_sigma <= 0.0 {
        return;
    }

    let spatial = spatial_weights(params.spatial_sigma);
    let range_denom = 2.0 * params.color_sigma * params.color_sigma;
    let keep = params.keep_original.clamp(0.0, 1.0);

    raster::map_interior_rgb(image, |window| {
        let mean = filtered_mean(window, &spatial, range_denom);
        raster::to_sample(window.center().mul_add(keep, mean * (1.0 - keep)))
    });
}
