//! Three-channel floating point images and blend masks.

use crate::error::SynthError;
use crate::grid::{checked_len, clamp_unit, ScalarGrid};

/// Number of colour channels in a [`ColorImage`].
pub const CHANNELS: usize = 3;

/// An RGB image with interleaved samples in [0, 1].
///
/// Shape is `height x width x 3` in row-major order, matching what an 8-bit
/// encoder expects after quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ColorImage {
    /// Creates an image where every pixel is `rgb`, each channel clamped to [0, 1].
    pub fn solid(width: usize, height: usize, rgb: [f64; 3]) -> Result<Self, SynthError> {
        let len = checked_len(width, height)?;
        let rgb = rgb.map(clamp_unit);
        let data = rgb.iter().copied().cycle().take(len * CHANNELS).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Interleaves three single-channel grids into one image.
    ///
    /// Returns `SynthError::DimensionMismatch` unless all three share dimensions.
    pub fn from_channels(
        r: &ScalarGrid,
        g: &ScalarGrid,
        b: &ScalarGrid,
    ) -> Result<Self, SynthError> {
        r.ensure_same_dimensions(g.dimensions())?;
        r.ensure_same_dimensions(b.dimensions())?;
        let data = r
            .data()
            .iter()
            .zip(g.data())
            .zip(b.data())
            .flat_map(|((&r, &g), &b)| [r, g, b])
            .collect();
        Ok(Self {
            width: r.width(),
            height: r.height(),
            data,
        })
    }

    /// Wraps interleaved data produced inside the crate that is already in range.
    pub(crate) fn from_unit_data(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height * CHANNELS);
        debug_assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
        Self {
            width,
            height,
            data,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Array shape `(height, width, 3)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, CHANNELS)
    }

    /// Interleaved RGB samples, row-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The three channel values at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> [f64; 3] {
        assert!(
            x < self.width && y < self.height,
            "({x}, {y}) out of bounds for {}x{} image",
            self.width,
            self.height
        );
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Extracts one channel (0 = red, 1 = green, 2 = blue) as a grid.
    ///
    /// Returns `SynthError::InvalidParameter` for a channel index above 2.
    pub fn channel(&self, channel: usize) -> Result<ScalarGrid, SynthError> {
        if channel >= CHANNELS {
            return Err(SynthError::invalid_parameter("channel", channel));
        }
        let data = self
            .data
            .iter()
            .skip(channel)
            .step_by(CHANNELS)
            .copied()
            .collect();
        Ok(ScalarGrid::from_unit_data(self.width, self.height, data))
    }

    /// Multiplies every sample by `factor`, clamping back into [0, 1].
    pub fn scale(&self, factor: f64) -> ColorImage {
        ColorImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| clamp_unit(v * factor)).collect(),
        }
    }
}

/// Per-pixel blend weight: the fraction of the second image in the output.
#[derive(Debug, Clone, Copy)]
pub enum Mask<'a> {
    /// One weight per pixel, broadcast across all three channels.
    Shared(&'a ScalarGrid),
    /// One weight per pixel and channel.
    PerChannel(&'a ColorImage),
}

impl Mask<'_> {
    /// `(width, height)` of the mask.
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            Mask::Shared(grid) => grid.dimensions(),
            Mask::PerChannel(image) => image.dimensions(),
        }
    }

    /// Weight for interleaved sample `index` (pixel `index / 3`, channel `index % 3`).
    pub(crate) fn weight(&self, index: usize) -> f64 {
        match self {
            Mask::Shared(grid) => grid.data()[index / CHANNELS],
            Mask::PerChannel(image) => image.data()[index],
        }
    }
}

impl<'a> From<&'a ScalarGrid> for Mask<'a> {
    fn from(grid: &'a ScalarGrid) -> Self {
        Mask::Shared(grid)
    }
}

impl<'a> From<&'a ColorImage> for Mask<'a> {
    fn from(image: &'a ColorImage) -> Self {
        Mask::PerChannel(image)
    }
}
