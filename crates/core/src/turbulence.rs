//! Fractal turbulence: weighted sums of smoothed value-noise octaves.
//!
//! Each [`Octave`] draws a coarse noise lattice whose cells are `scale`
//! pixels apart, smooths it and bilinearly resamples it to the output size.
//! Scales grow geometrically with the octave index and every octave is
//! weighted by its scale, so broad features dominate and finer octaves add
//! detail on top. Dividing by the total weight keeps the result in [0, 1].

use serde_json::{json, Value};

use crate::error::SynthError;
use crate::grid::{checked_len, clamp_unit, eval_rows, ScalarGrid};
use crate::image::ColorImage;
use crate::noise::{generate_noise, smooth};
use crate::params::{param_f64, param_usize};
use crate::prng::RandomSource;

/// Default number of octaves.
pub const DEFAULT_DEPTH: usize = 7;
/// Default feature scale of the first octave, in pixels.
pub const DEFAULT_INITIAL_SCALE: f64 = 3.0;
/// Default scale ratio between consecutive octaves.
pub const DEFAULT_LACUNARITY: f64 = 2.0;
/// Smoothing radius applied to every octave lattice.
const OCTAVE_SMOOTHING: usize = 1;

/// Parameters for a turbulence field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurbulenceParams {
    /// Number of octaves summed. Must be at least 1.
    pub depth: usize,
    /// Feature scale of octave 0 in pixels. Must be positive and finite.
    pub initial_scale: f64,
    /// Ratio between consecutive octave scales. Must be greater than 1.
    pub lacunarity: f64,
}

impl Default for TurbulenceParams {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            initial_scale: DEFAULT_INITIAL_SCALE,
            lacunarity: DEFAULT_LACUNARITY,
        }
    }
}

impl TurbulenceParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        Self {
            depth: param_usize(params, "depth", DEFAULT_DEPTH),
            initial_scale: param_f64(params, "initial_scale", DEFAULT_INITIAL_SCALE),
            lacunarity: param_f64(params, "lacunarity", DEFAULT_LACUNARITY),
        }
    }

    /// Current values as a JSON object.
    pub fn to_json(&self) -> Value {
        json!({
            "depth": self.depth,
            "initial_scale": self.initial_scale,
            "lacunarity": self.lacunarity,
        })
    }

    /// Schema describing each parameter's type, range, and default.
    pub fn param_schema() -> Value {
        json!({
            "depth": {
                "type": "integer",
                "min": 1,
                "default": DEFAULT_DEPTH,
                "description": "Number of noise octaves summed"
            },
            "initial_scale": {
                "type": "float",
                "min": 0.0,
                "exclusive_min": true,
                "default": DEFAULT_INITIAL_SCALE,
                "description": "Feature size of the first octave in pixels"
            },
            "lacunarity": {
                "type": "float",
                "min": 1.0,
                "exclusive_min": true,
                "default": DEFAULT_LACUNARITY,
                "description": "Scale multiplier between consecutive octaves"
            }
        })
    }

    /// Checks `depth >= 1`, `initial_scale > 0` and `lacunarity > 1`, all
    /// finite, and that the summed octave weights stay finite.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.depth == 0 {
            return Err(SynthError::invalid_parameter("depth", self.depth));
        }
        if !(self.initial_scale.is_finite() && self.initial_scale > 0.0) {
            return Err(SynthError::invalid_parameter(
                "initial_scale",
                self.initial_scale,
            ));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 1.0) {
            return Err(SynthError::invalid_parameter("lacunarity", self.lacunarity));
        }
        // Total weight is at most depth * last scale; compare in log space.
        let last_scale_ln =
            self.initial_scale.ln() + (self.depth - 1) as f64 * self.lacunarity.ln();
        if last_scale_ln + (self.depth as f64).ln() >= f64::MAX.ln() {
            return Err(SynthError::invalid_parameter(
                "depth",
                format!("{} (octave scales overflow)", self.depth),
            ));
        }
        Ok(())
    }
}

/// One layer of a turbulence sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Octave {
    /// Zero-based octave index.
    pub index: usize,
    /// Distance in pixels between lattice points.
    pub scale: f64,
    /// Contribution of this octave to the sum.
    pub weight: f64,
}

/// Lazily yields `depth` octaves with strictly increasing scale.
pub fn octaves(
    depth: usize,
    initial_scale: f64,
    lacunarity: f64,
) -> impl Iterator<Item = Octave> {
    (0..depth).scan(initial_scale, move |scale, index| {
        let octave = Octave {
            index,
            scale: *scale,
            weight: *scale,
        };
        *scale *= lacunarity;
        Some(octave)
    })
}

/// Builds a `size x size` turbulence field from `depth` octaves.
///
/// Returns `SynthError::InvalidDimensions` for `size == 0` and
/// `SynthError::InvalidParameter` for `depth == 0` or a non-positive
/// `initial_scale`.
pub fn turbulence<R>(
    size: usize,
    depth: usize,
    initial_scale: f64,
    rng: &mut R,
) -> Result<ScalarGrid, SynthError>
where
    R: RandomSource + ?Sized,
{
    let params = TurbulenceParams {
        depth,
        initial_scale,
        ..TurbulenceParams::default()
    };
    turbulence_with(size, &params, rng)
}

/// Builds a `size x size` turbulence field from explicit parameters.
pub fn turbulence_with<R>(
    size: usize,
    params: &TurbulenceParams,
    rng: &mut R,
) -> Result<ScalarGrid, SynthError>
where
    R: RandomSource + ?Sized,
{
    let len = checked_len(size, size)?;
    params.validate()?;

    let (sum, total_weight) = octaves(params.depth, params.initial_scale, params.lacunarity)
        .try_fold(
            (vec![0.0; len], 0.0),
            |(mut sum, total), octave| -> Result<_, SynthError> {
                let layer = octave_layer(size, octave.scale, rng)?;
                sum.iter_mut()
                    .zip(&layer)
                    .for_each(|(acc, v)| *acc += octave.weight * v);
                Ok((sum, total + octave.weight))
            },
        )?;

    let data = sum.into_iter().map(|v| clamp_unit(v / total_weight)).collect();
    Ok(ScalarGrid::from_unit_data(size, size, data))
}

/// Builds an RGB image whose channels are independent turbulence fields.
pub fn turbulence_rgb<R>(size: usize, rng: &mut R) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    turbulence_rgb_with(size, &TurbulenceParams::default(), rng)
}

/// Builds an RGB turbulence image from explicit parameters.
pub fn turbulence_rgb_with<R>(
    size: usize,
    params: &TurbulenceParams,
    rng: &mut R,
) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    let r = turbulence_with(size, params, rng)?;
    let g = turbulence_with(size, params, rng)?;
    let b = turbulence_with(size, params, rng)?;
    ColorImage::from_channels(&r, &g, &b)
}

/// Smoothed noise lattice with `scale`-pixel spacing, resampled to `size x size`.
///
/// Scales below one pixel sample the lattice one cell per pixel; finer
/// spacing than that would not be visible in the output.
fn octave_layer<R>(size: usize, scale: f64, rng: &mut R) -> Result<Vec<f64>, SynthError>
where
    R: RandomSource + ?Sized,
{
    let spacing = scale.max(1.0);
    let lattice_side = ((size - 1) as f64 / spacing).floor() as usize + 2;
    let lattice = smooth(&generate_noise(lattice_side, rng)?, OCTAVE_SMOOTHING);
    eval_rows(size, size, |x, y| {
        lattice.sample_bilinear(x as f64 / spacing, y as f64 / spacing)
    })
}
