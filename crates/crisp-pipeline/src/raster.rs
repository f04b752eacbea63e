//! Raster invariants and 3x3 neighborhood iteration.
//!
//! Every pixel-wise stage in the enhancer reads from a snapshot of the
//! buffer and writes into the live buffer, so a stage never sees its own
//! output. The 3x3 stages only visit interior pixels; the one-pixel
//! border keeps its incoming value.

use crate::types::{Dimensions, PipelineError, RgbaImage};

/// Number of interleaved samples per pixel.
pub const CHANNELS: usize = 4;

/// Check the raster invariant: non-zero width and height, and exactly
/// `width * height * 4` samples.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] describing the violation.
pub fn validate(image: &RgbaImage) -> Result<Dimensions, PipelineError> {
    let dims = Dimensions::of(image);
    if dims.width == 0 || dims.height == 0 {
        return Err(PipelineError::InvalidBuffer(format!(
            "dimensions must be non-zero, got {}x{}",
            dims.width, dims.height,
        )));
    }

    let expected = usize::try_from(dims.pixel_count())
        .ok()
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            PipelineError::InvalidBuffer(format!(
                "{}x{} does not fit in memory",
                dims.width, dims.height,
            ))
        })?;
    let actual = image.as_raw().len();
    if actual != expected {
        return Err(PipelineError::InvalidBuffer(format!(
            "expected {expected} samples for {}x{}, found {actual}",
            dims.width, dims.height,
        )));
    }
    Ok(dims)
}

/// Round and clamp a channel value into `0..=255`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_sample(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// A read-only 3x3 window over one channel of a snapshot, centered on
/// an interior pixel.
pub struct Window<'a> {
    samples: &'a [u8],
    width: usize,
    x: usize,
    y: usize,
    channel: usize,
}

impl Window<'_> {
    /// The center sample.
    #[must_use]
    pub fn center(&self) -> f32 {
        self.at(1, 1)
    }

    /// Sample at window position `(kx, ky)`, each in `0..3`, where
    /// `(1, 1)` is the center.
    #[must_use]
    pub fn at(&self, kx: usize, ky: usize) -> f32 {
        let idx = ((self.y + ky - 1) * self.width + (self.x + kx - 1)) * CHANNELS + self.channel;
        f32::from(self.samples[idx])
    }

    /// Iterate over all nine `(kx, ky, sample)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..3).flat_map(move |ky| (0..3).map(move |kx| (kx, ky, self.at(kx, ky))))
    }
}

/// Replace every interior R, G, B sample with `f(window)`.
///
/// `f` sees a window over the pre-pass snapshot. Alpha and the border
/// row/column are left untouched. Images narrower or shorter than three
/// pixels have no interior and are returned unchanged.
pub fn map_interior_rgb<F>(image: &mut RgbaImage, mut f: F)
where
    F: FnMut(&Window<'_>) -> u8,
{
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w < 3 || h < 3 {
        return;
    }

    let snapshot = image.as_raw().clone();
    let out: &mut [u8] = image;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let base = (y * w + x) * CHANNELS;
            for channel in 0..3 {
                let window = Window {
                    samples: &snapshot,
                    width: w,
                    x,
                    y,
                    channel,
                };
                out[base + channel] = f(&window);
            }
        }
    }
}

/// Replace every pixel's R, G, B samples with `f([r, g, b])`.
///
/// Alpha is left untouched.
pub fn map_rgb<F>(image: &mut RgbaImage, mut f: F)
where
    F: FnMut([f32; 3]) -> [f32; 3],
{
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let mapped = f([f32::from(r), f32::from(g), f32::from(b)]);
        pixel.0[0] = to_sample(mapped[0]);
        pixel.0[1] = to_sample(mapped[1]);
        pixel.0[2] = to_sample(mapped[2]);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_well_formed_buffer() {
        let img = RgbaImage::new(5, 3);
        assert_eq!(validate(&img).unwrap(), Dimensions::new(5, 3));
    }

    #[test]
    fn validate_rejects_zero_width() {
        let img = RgbaImage::from_raw(0, 4, Vec::new()).unwrap();
        assert!(matches!(
            validate(&img),
            Err(PipelineError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn validate_rejects_oversized_sample_vector() {
        // `from_raw` accepts a buffer that is larger than needed.
        let img = RgbaImage::from_raw(2, 2, vec![0; 2 * 2 * 4 + 4]).unwrap();
        assert!(matches!(
            validate(&img),
            Err(PipelineError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn to_sample_rounds_and_clamps() {
        assert_eq!(to_sample(-12.0), 0);
        assert_eq!(to_sample(0.49), 0);
        assert_eq!(to_sample(0.5), 1);
        assert_eq!(to_sample(254.6), 255);
        assert_eq!(to_sample(300.0), 255);
    }

    #[test]
    fn window_reads_neighbors() {
        // Red channel encodes x + 10 * y.
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbaImage::from_fn(4, 4, |x, y| image::Rgba([(x + 10 * y) as u8, 0, 0, 255]));
        let mut seen = Vec::new();
        let mut copy = img.clone();
        map_interior_rgb(&mut copy, |w| {
            if w.channel == 0 && w.x == 1 && w.y == 1 {
                seen = w.iter().map(|(_, _, v)| v).collect();
            }
            // Identity.
            to_sample(w.center())
        });
        assert_eq!(
            seen,
            vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]
        );
        assert_eq!(copy, img);
    }

    #[test]
    fn map_interior_leaves_border_and_alpha() {
        let mut img = RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 40]));
        map_interior_rgb(&mut img, |_| 99);
        for (x, y, p) in img.enumerate_pixels() {
            let interior = (1..3).contains(&x) && y == 1;
            if interior {
                assert_eq!(p.0, [99, 99, 99, 40], "interior ({x},{y})");
            } else {
                assert_eq!(p.0, [10, 20, 30, 40], "border ({x},{y})");
            }
        }
    }

    #[test]
    fn map_interior_skips_tiny_images() {
        let mut img = RgbaImage::from_pixel(2, 8, image::Rgba([1, 2, 3, 4]));
        let before = img.clone();
        map_interior_rgb(&mut img, |_| 200);
        assert_eq!(img, before);
    }

    #[test]
    fn map_rgb_preserves_alpha() {
        let mut img = RgbaImage::from_pixel(2, 2, image::Rgba([100, 100, 100, 7]));
        map_rgb(&mut img, |[r, g, b]| [r * 3.0, g - 200.0, b]);
        for p in img.pixels() {
            assert_eq!(p.0, [255, 0, 100, 7]);
        }
    }
}
