//! Pure-computation conversion from [`ColorImage`] to 8-bit pixel buffers.
//!
//! Always available (no feature gate) so callers that bring their own encoder
//! share the same quantization as the `png` snapshot path.

use backdrop_core::image::ColorImage;

/// Maps a sample in [0, 1] to 0..=255 by rounding `v * 255`.
///
/// Out-of-range input is clamped first and NaN maps to 0.
pub fn quantize(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Quantizes an image to an interleaved RGB8 buffer of length `width * height * 3`.
pub fn image_to_rgb8(image: &ColorImage) -> Vec<u8> {
    image.data().iter().map(|&v| quantize(v)).collect()
}
