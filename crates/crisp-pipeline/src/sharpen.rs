//! 3x3 kernel sharpening.
//!
//! The kernel response at each interior sample is blended with the
//! original value: `v + (k - v) · amount`. Both kernels sum to 1, so flat
//! regions are unchanged and only local differences are amplified.

use crate::raster;
use crate::types::RgbaImage;

/// A 3x3 convolution kernel, row-major.
pub type Kernel3x3 = [[f32; 3]; 3];

/// Mild kernel used in conservative mode.
pub const MILD_KERNEL: Kernel3x3 = [[0.0, -0.5, 0.0], [-0.5, 3.0, -0.5], [0.0, -0.5, 0.0]];

/// Classic unsharp kernel used in standard mode.
pub const UNSHARP_KERNEL: Kernel3x3 = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

/// Blend amount for a sharpness factor: the excess over 1.0, capped at
/// `max_amount`. Zero when `sharpness <= 1.0`.
#[must_use]
pub fn blend_amount(sharpness: f32, max_amount: f32) -> f32 {
    (sharpness - 1.0).clamp(0.0, max_amount)
}

/// Sharpen the interior R, G, B samples in place.
///
/// A non-positive `amount` leaves the image unchanged.
pub fn sharpen(image: &mut RgbaImage, kernel: &Kernel3x3, amount: f32) {
    if amount <= 0.0 {
        return;
    }

    raster::map_interior_rgb(image, |window| {
        let response = window
            .iter()
            .fold(0.0_f32, |acc, (kx, ky, v)| kernel[ky][kx].mul_add(v, acc));
        let center = window.center();
        raster::to_sample((response - center).mul_add(amount, center))
    });
}
