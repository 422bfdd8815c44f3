//! PNG encoding of a [`ColorImage`].
//!
//! Feature-gated behind `png` (default on) so library users that only need
//! the in-memory pipeline do not pull in the `image` crate.

use backdrop_core::error::SynthError;
use backdrop_core::image::ColorImage;
use std::path::Path;

use crate::pixel::image_to_rgb8;

/// Writes an image as an 8-bit RGB PNG, creating parent directories as needed.
///
/// Returns `SynthError::InvalidDimensions` if the image dimensions overflow
/// `u32`, or `SynthError::Io` on write failure.
pub fn write_png(image: &ColorImage, path: &Path) -> Result<(), SynthError> {
    let invalid = || SynthError::InvalidDimensions {
        width: image.width(),
        height: image.height(),
    };
    let w = u32::try_from(image.width()).map_err(|_| invalid())?;
    let h = u32::try_from(image.height()).map_err(|_| invalid())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| SynthError::Io(format!("{}: {e}", parent.display())))?;
    }
    let img = image::RgbImage::from_raw(w, h, image_to_rgb8(image))
        .ok_or_else(|| SynthError::Io("RGB buffer size mismatch".into()))?;
    img.save(path)
        .map_err(|e| SynthError::Io(format!("{}: {e}", path.display())))
}
