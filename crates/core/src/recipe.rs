//! Reproducible description of one generated background.
//!
//! A [`Recipe`] captures everything needed to recreate an image: side length,
//! layer count, PRNG seed, and parameter overrides.

use serde::{Deserialize, Serialize};

use crate::compose::{random_background_with, BackgroundParams};
use crate::error::SynthError;
use crate::image::ColorImage;
use crate::prng::Xorshift64;

/// Everything needed to re-render one background image bit-exactly.
///
/// Two identical `Recipe` values rendered by the same binary produce
/// bit-identical images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub size: usize,
    pub layers: usize,
    pub seed: u64,
    pub params: serde_json::Value,
}

impl Recipe {
    /// Creates a recipe with default params (`{}`).
    pub fn new(size: usize, layers: usize, seed: u64) -> Self {
        Self {
            size,
            layers,
            seed,
            params: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Parses and validates the recipe's params.
    pub fn background_params(&self) -> Result<BackgroundParams, SynthError> {
        BackgroundParams::from_json(&self.params)
    }

    /// Checks the size is non-zero and the params are valid.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.size == 0 {
            return Err(SynthError::InvalidDimensions {
                width: self.size,
                height: self.size,
            });
        }
        self.size
            .checked_mul(self.size)
            .ok_or(SynthError::InvalidDimensions {
                width: self.size,
                height: self.size,
            })?;
        self.background_params().map(|_| ())
    }

    /// Renders the background this recipe describes.
    pub fn render(&self) -> Result<ColorImage, SynthError> {
        let params = self.background_params()?;
        let mut rng = Xorshift64::new(self.seed);
        random_background_with(self.layers, self.size, &params, &mut rng)
    }
}
