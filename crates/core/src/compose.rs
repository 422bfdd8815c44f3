//! Compositing: mask-weighted blending and the layered random background.
//!
//! A background starts from one random base image (a solid colour or a
//! turbulence field) and then, once per layer, blends a fresh random image
//! over the accumulator through a metaball mask.

use rayon::prelude::*;
use serde_json::{json, Value};

use crate::error::SynthError;
use crate::grid::{checked_len, clamp_unit};
use crate::image::{ColorImage, Mask};
use crate::metaball::{random_metaball_with, Combine, Falloff};
use crate::params::{param_f64, param_object, param_range, param_string, param_usize};
use crate::prng::RandomSource;
use crate::turbulence::{turbulence_rgb_with, TurbulenceParams};

/// Default probability that a layer image is a solid colour.
const DEFAULT_SOLID_PROBABILITY: f64 = 0.5;
/// Default number of metaball sources per mask.
const DEFAULT_METABALL_COUNT: usize = 4;
/// Default half-open range for the per-mask radius scale.
const DEFAULT_RADIUS_RANGE: (f64, f64) = (0.1, 0.5);
/// Default half-open range for the turbulence brightness gain.
const DEFAULT_GAIN_RANGE: (f64, f64) = (0.0, 2.0);

/// Tunable constants for [`random_background_with`].
///
/// [`Default`] reproduces the classic look: even odds of solid vs turbulent
/// layers, four metaballs per mask, radius scale in [0.1, 0.5) and turbulence
/// brightness gain in [0, 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundParams {
    /// Probability that a drawn image is a solid colour instead of turbulence.
    pub solid_probability: f64,
    /// Number of influence sources in every blend mask.
    pub metaball_count: usize,
    /// Range the per-mask radius scale is drawn from.
    pub radius_range: (f64, f64),
    /// Range the turbulence brightness gain is drawn from. Gains above 1
    /// saturate bright regions after clamping.
    pub gain_range: (f64, f64),
    /// Falloff kernel of the mask sources.
    pub falloff: Falloff,
    /// How overlapping mask sources merge.
    pub combine: Combine,
    /// Parameters of every turbulence image.
    pub turbulence: TurbulenceParams,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            solid_probability: DEFAULT_SOLID_PROBABILITY,
            metaball_count: DEFAULT_METABALL_COUNT,
            radius_range: DEFAULT_RADIUS_RANGE,
            gain_range: DEFAULT_GAIN_RANGE,
            falloff: Falloff::default(),
            combine: Combine::default(),
            turbulence: TurbulenceParams::default(),
        }
    }
}

impl BackgroundParams {
    /// Extracts parameters from a JSON object, falling back to defaults for
    /// missing keys, then validates them.
    ///
    /// Unknown `falloff` or `combine` names are rejected rather than defaulted.
    pub fn from_json(params: &Value) -> Result<Self, SynthError> {
        let falloff_name = param_string(params, "falloff", Falloff::default().name());
        let falloff = Falloff::from_name(&falloff_name)
            .ok_or_else(|| SynthError::invalid_parameter("falloff", &falloff_name))?;
        let combine_name = param_string(params, "combine", Combine::default().name());
        let combine = Combine::from_name(&combine_name)
            .ok_or_else(|| SynthError::invalid_parameter("combine", &combine_name))?;

        let parsed = Self {
            solid_probability: param_f64(params, "solid_probability", DEFAULT_SOLID_PROBABILITY),
            metaball_count: param_usize(params, "metaball_count", DEFAULT_METABALL_COUNT),
            radius_range: param_range(params, "radius_range", DEFAULT_RADIUS_RANGE),
            gain_range: param_range(params, "gain_range", DEFAULT_GAIN_RANGE),
            falloff,
            combine,
            turbulence: TurbulenceParams::from_json(param_object(params, "turbulence")),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Current values as a JSON object accepted by [`BackgroundParams::from_json`].
    pub fn to_json(&self) -> Value {
        json!({
            "solid_probability": self.solid_probability,
            "metaball_count": self.metaball_count,
            "radius_range": [self.radius_range.0, self.radius_range.1],
            "gain_range": [self.gain_range.0, self.gain_range.1],
            "falloff": self.falloff.name(),
            "combine": self.combine.name(),
            "turbulence": self.turbulence.to_json(),
        })
    }

    /// Schema describing all available parameters, their types, ranges, and defaults.
    pub fn param_schema() -> Value {
        json!({
            "solid_probability": {
                "type": "float",
                "min": 0.0,
                "max": 1.0,
                "default": DEFAULT_SOLID_PROBABILITY,
                "description": "Chance that a layer is a solid colour rather than turbulence"
            },
            "metaball_count": {
                "type": "integer",
                "min": 1,
                "default": DEFAULT_METABALL_COUNT,
                "description": "Influence sources per blend mask"
            },
            "radius_range": {
                "type": "range",
                "min": 0.0,
                "exclusive_min": true,
                "default": [DEFAULT_RADIUS_RANGE.0, DEFAULT_RADIUS_RANGE.1],
                "description": "Metaball radius as a fraction of the image side"
            },
            "gain_range": {
                "type": "range",
                "min": 0.0,
                "default": [DEFAULT_GAIN_RANGE.0, DEFAULT_GAIN_RANGE.1],
                "description": "Brightness multiplier applied to turbulence layers"
            },
            "falloff": {
                "type": "enum",
                "values": Falloff::NAMES,
                "default": Falloff::default().name(),
                "description": "Metaball falloff kernel"
            },
            "combine": {
                "type": "enum",
                "values": Combine::NAMES,
                "default": Combine::default().name(),
                "description": "How overlapping metaballs merge"
            },
            "turbulence": TurbulenceParams::param_schema(),
        })
    }

    /// Checks every field against its documented domain.
    pub fn validate(&self) -> Result<(), SynthError> {
        if !(0.0..=1.0).contains(&self.solid_probability) {
            return Err(SynthError::invalid_parameter(
                "solid_probability",
                self.solid_probability,
            ));
        }
        if self.metaball_count == 0 {
            return Err(SynthError::invalid_parameter(
                "metaball_count",
                self.metaball_count,
            ));
        }
        let (r_lo, r_hi) = self.radius_range;
        if !(r_lo.is_finite() && r_hi.is_finite() && r_lo > 0.0 && r_lo <= r_hi) {
            return Err(SynthError::invalid_parameter(
                "radius_range",
                format!("[{r_lo}, {r_hi}]"),
            ));
        }
        let (g_lo, g_hi) = self.gain_range;
        if !(g_lo.is_finite() && g_hi.is_finite() && g_lo >= 0.0 && g_lo <= g_hi) {
            return Err(SynthError::invalid_parameter(
                "gain_range",
                format!("[{g_lo}, {g_hi}]"),
            ));
        }
        self.turbulence.validate()
    }
}

/// Computes `image1 * (1 - mask) + image2 * mask` per pixel and channel.
///
/// `mask` may be a [`ScalarGrid`](crate::ScalarGrid) (shared by all channels)
/// or a [`ColorImage`] (one weight per channel). Returns
/// `SynthError::DimensionMismatch` unless all three share dimensions.
pub fn blend<'a>(
    image1: &ColorImage,
    image2: &ColorImage,
    mask: impl Into<Mask<'a>>,
) -> Result<ColorImage, SynthError> {
    let mask = mask.into();
    for (w, h) in [image2.dimensions(), mask.dimensions()] {
        if image1.dimensions() != (w, h) {
            return Err(SynthError::DimensionMismatch {
                lhs_w: image1.width(),
                lhs_h: image1.height(),
                rhs_w: w,
                rhs_h: h,
            });
        }
    }

    let data = image1
        .data()
        .par_iter()
        .zip(image2.data().par_iter())
        .enumerate()
        .map(|(i, (&a, &b))| mix(a, b, mask.weight(i)))
        .collect();
    Ok(ColorImage::from_unit_data(
        image1.width(),
        image1.height(),
        data,
    ))
}

/// `a * (1 - m) + b * m`, exact at `m == 0`, `m == 1` and `a == b`.
fn mix(a: f64, b: f64, m: f64) -> f64 {
    if a == b {
        return a;
    }
    clamp_unit(a * (1.0 - m) + b * m)
}

/// A `size x size` image of one uniformly random colour.
pub fn random_color<R>(size: usize, rng: &mut R) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    let rgb = [rng.next_f64(), rng.next_f64(), rng.next_f64()];
    ColorImage::solid(size, size, rgb)
}

/// Draws either a solid colour or a gain-scaled turbulence image.
pub fn random_image<R>(
    size: usize,
    params: &BackgroundParams,
    rng: &mut R,
) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    if rng.next_f64() < params.solid_probability {
        tracing::trace!("drew solid colour image");
        return random_color(size, rng);
    }
    let turbulence = turbulence_rgb_with(size, &params.turbulence, rng)?;
    let gain = rng.next_range(params.gain_range.0, params.gain_range.1);
    tracing::trace!(gain, "drew turbulence image");
    Ok(turbulence.scale(gain))
}

/// Builds a `size x size` background from a base image and `layers` blends,
/// using [`BackgroundParams::default`].
pub fn random_background<R>(
    layers: usize,
    size: usize,
    rng: &mut R,
) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    random_background_with(layers, size, &BackgroundParams::default(), rng)
}

/// Builds a background with explicit parameters.
///
/// With `layers == 0` the base image is returned unchanged. Every layer
/// draws its image and mask radius independently of earlier layers.
pub fn random_background_with<R>(
    layers: usize,
    size: usize,
    params: &BackgroundParams,
    rng: &mut R,
) -> Result<ColorImage, SynthError>
where
    R: RandomSource + ?Sized,
{
    checked_len(size, size)?;
    params.validate()?;

    let base = random_image(size, params, rng)?;
    (0..layers).try_fold(base, |acc, layer| {
        let overlay = random_image(size, params, rng)?;
        let radius_scale = rng.next_range(params.radius_range.0, params.radius_range.1);
        tracing::debug!(layer, radius_scale, "blending layer");
        let mask = random_metaball_with(
            size,
            size,
            params.metaball_count,
            radius_scale,
            params.falloff,
            params.combine,
            rng,
        )?;
        blend(&acc, &overlay, &mask)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ScalarGrid;
    use crate::metaball::random_metaball;
    use crate::prng::Xorshift64;
    use crate::turbulence::turbulence_rgb;

    fn in_unit_range(image: &ColorImage) -> bool {
        image.data().iter().all(|v| (0.0..=1.0).contains(v))
    }

    fn gradient_image(size: usize) -> ColorImage {
        let r = ScalarGrid::from_fn(size, size, |x, _| x as f64 / size as f64).unwrap();
        let g = ScalarGrid::from_fn(size, size, |_, y| y as f64 / size as f64).unwrap();
        let b = ScalarGrid::filled(size, size, 0.3).unwrap();
        ColorImage::from_channels(&r, &g, &b).unwrap()
    }

    #[test]
    fn blend_with_zero_mask_returns_first_image() {
        let a = gradient_image(8);
        let b = ColorImage::solid(8, 8, [0.9, 0.1, 0.5]).unwrap();
        let zero = ScalarGrid::new(8, 8).unwrap();
        assert_eq!(blend(&a, &b, &zero).unwrap(), a);
    }

    #[test]
    fn blend_with_one_mask_returns_second_image() {
        let a = gradient_image(8);
        let b = ColorImage::solid(8, 8, [0.9, 0.1, 0.5]).unwrap();
        let one = ScalarGrid::filled(8, 8, 1.0).unwrap();
        assert_eq!(blend(&a, &b, &one).unwrap(), b);
    }

    #[test]
    fn blend_of_image_with_itself_is_identity() {
        let a = gradient_image(16);
        let mask = random_metaball_with(
            16,
            16,
            3,
            0.3,
            Falloff::Gaussian,
            Combine::Sum,
            &mut Xorshift64::new(4),
        )
        .unwrap();
        assert_eq!(blend(&a, &a, &mask).unwrap(), a);
    }

    #[test]
    fn blend_of_turbulence_with_itself_is_bit_exact() {
        let mut rng = Xorshift64::new(42);
        let a = turbulence_rgb(64, &mut rng).unwrap();
        let mask = random_metaball(64, 64, 4, 0.3, &mut rng).unwrap();
        let out = blend(&a, &a, &mask).unwrap();
        let differing = out
            .data()
            .iter()
            .zip(a.data())
            .filter(|(x, y)| x.to_bits() != y.to_bits())
            .count();
        assert_eq!(differing, 0);
    }

    #[test]
    fn blend_half_mask_averages() {
        let a = ColorImage::solid(2, 2, [0.0, 0.2, 1.0]).unwrap();
        let b = ColorImage::solid(2, 2, [1.0, 0.6, 0.0]).unwrap();
        let half = ScalarGrid::filled(2, 2, 0.5).unwrap();
        let out = blend(&a, &b, &half).unwrap();
        let px = out.pixel(1, 1);
        assert!((px[0] - 0.5).abs() < 1e-12);
        assert!((px[1] - 0.4).abs() < 1e-12);
        assert!((px[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn blend_per_channel_mask_weights_each_channel() {
        let a = ColorImage::solid(2, 2, [0.0, 0.0, 0.0]).unwrap();
        let b = ColorImage::solid(2, 2, [1.0, 1.0, 1.0]).unwrap();
        let mask = ColorImage::solid(2, 2, [0.0, 0.25, 1.0]).unwrap();
        let out = blend(&a, &b, &mask).unwrap();
        assert_eq!(out.pixel(0, 1), [0.0, 0.25, 1.0]);
    }

    #[test]
    fn blend_300_with_200_is_dimension_mismatch() {
        let a = ColorImage::solid(300, 300, [0.2; 3]).unwrap();
        let b = ColorImage::solid(200, 200, [0.8; 3]).unwrap();
        let mask = ScalarGrid::filled(300, 300, 0.5).unwrap();
        assert!(matches!(
            blend(&a, &b, &mask),
            Err(SynthError::DimensionMismatch {
                lhs_w: 300,
                rhs_w: 200,
                ..
            })
        ));
    }

    #[test]
    fn blend_rejects_mismatched_mask() {
        let a = ColorImage::solid(4, 4, [0.2; 3]).unwrap();
        let mask = ScalarGrid::filled(4, 3, 0.5).unwrap();
        assert!(matches!(
            blend(&a, &a, &mask),
            Err(SynthError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn random_color_is_uniform_across_pixels() {
        let img = random_color(5, &mut Xorshift64::new(3)).unwrap();
        let first = img.pixel(0, 0);
        assert!((0..5).all(|y| (0..5).all(|x| img.pixel(x, y) == first)));
    }

    #[test]
    fn random_image_honours_solid_probability_extremes() {
        let always_solid = BackgroundParams {
            solid_probability: 1.0,
            ..BackgroundParams::default()
        };
        let never_solid = BackgroundParams {
            solid_probability: 0.0,
            gain_range: (1.0, 1.0),
            ..BackgroundParams::default()
        };
        let mut rng = Xorshift64::new(21);
        let solid = random_image(16, &always_solid, &mut rng).unwrap();
        let first = solid.pixel(0, 0);
        assert!((0..16).all(|y| (0..16).all(|x| solid.pixel(x, y) == first)));
        let turbulent = random_image(16, &never_solid, &mut rng).unwrap();
        assert!(turbulent.channel(0).unwrap().variance() > 0.0);
    }

    #[test]
    fn random_background_3_300_has_shape_and_range() {
        let img = random_background(3, 300, &mut Xorshift64::new(42)).unwrap();
        assert_eq!(img.shape(), (300, 300, 3));
        assert!(in_unit_range(&img));
    }

    #[test]
    fn random_background_differs_between_seeds() {
        let a = random_background(3, 64, &mut Xorshift64::new(1)).unwrap();
        let b = random_background(3, 64, &mut Xorshift64::new(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn random_background_is_reproducible_for_same_seed() {
        let a = random_background(2, 48, &mut Xorshift64::new(99)).unwrap();
        let b = random_background(2, 48, &mut Xorshift64::new(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn random_background_zero_layers_is_the_base_image() {
        let params = BackgroundParams::default();
        let background = random_background(0, 32, &mut Xorshift64::new(8)).unwrap();
        let base = random_image(32, &params, &mut Xorshift64::new(8)).unwrap();
        assert_eq!(background, base);
    }

    #[test]
    fn random_background_rejects_zero_size() {
        assert!(matches!(
            random_background(2, 0, &mut Xorshift64::new(1)),
            Err(SynthError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn random_background_rejects_invalid_params() {
        let params = BackgroundParams {
            metaball_count: 0,
            ..BackgroundParams::default()
        };
        assert!(matches!(
            random_background_with(1, 8, &params, &mut Xorshift64::new(1)),
            Err(SynthError::InvalidParameter {
                name: "metaball_count",
                ..
            })
        ));
    }

    #[test]
    fn params_from_empty_json_are_defaults() {
        let params = BackgroundParams::from_json(&json!({})).unwrap();
        assert_eq!(params, BackgroundParams::default());
    }

    #[test]
    fn params_json_round_trip() {
        let params = BackgroundParams {
            solid_probability: 0.25,
            metaball_count: 6,
            radius_range: (0.2, 0.3),
            gain_range: (0.5, 1.5),
            falloff: Falloff::Gaussian,
            combine: Combine::Max,
            turbulence: TurbulenceParams {
                depth: 4,
                initial_scale: 2.0,
                lacunarity: 2.5,
            },
        };
        assert_eq!(BackgroundParams::from_json(&params.to_json()).unwrap(), params);
    }

    #[test]
    fn params_from_json_rejects_unknown_names_and_bad_ranges() {
        assert!(matches!(
            BackgroundParams::from_json(&json!({"falloff": "cubic"})),
            Err(SynthError::InvalidParameter { name: "falloff", .. })
        ));
        assert!(matches!(
            BackgroundParams::from_json(&json!({"combine": "min"})),
            Err(SynthError::InvalidParameter { name: "combine", .. })
        ));
        assert!(matches!(
            BackgroundParams::from_json(&json!({"radius_range": [0.5, 0.1]})),
            Err(SynthError::InvalidParameter {
                name: "radius_range",
                ..
            })
        ));
        assert!(matches!(
            BackgroundParams::from_json(&json!({"gain_range": [-1.0, 1.0]})),
            Err(SynthError::InvalidParameter {
                name: "gain_range",
                ..
            })
        ));
        assert!(matches!(
            BackgroundParams::from_json(&json!({"solid_probability": 1.5})),
            Err(SynthError::InvalidParameter {
                name: "solid_probability",
                ..
            })
        ));
        assert!(matches!(
            BackgroundParams::from_json(&json!({"turbulence": {"depth": 0}})),
            Err(SynthError::InvalidParameter { name: "depth", .. })
        ));
    }

    #[test]
    fn param_schema_covers_every_json_key() {
        let schema = BackgroundParams::param_schema();
        let current = BackgroundParams::default().to_json();
        for key in current.as_object().unwrap().keys() {
            assert!(schema.get(key).is_some(), "schema missing '{key}'");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn random_background_in_unit_range(
                seed: u64,
                layers in 0_usize..=3,
                size in 1_usize..=24,
            ) {
                let img = random_background(layers, size, &mut Xorshift64::new(seed)).unwrap();
                prop_assert_eq!(img.shape(), (size, size, 3));
                prop_assert!(in_unit_range(&img));
            }

            #[test]
            fn blend_stays_between_its_inputs(
                a in prop::array::uniform3(0.0_f64..=1.0),
                b in prop::array::uniform3(0.0_f64..=1.0),
                m in 0.0_f64..=1.0,
            ) {
                let ia = ColorImage::solid(2, 2, a).unwrap();
                let ib = ColorImage::solid(2, 2, b).unwrap();
                let mask = ScalarGrid::filled(2, 2, m).unwrap();
                let out = blend(&ia, &ib, &mask).unwrap();
                for (c, v) in out.pixel(0, 0).iter().enumerate() {
                    let (lo, hi) = (a[c].min(b[c]), a[c].max(b[c]));
                    prop_assert!(*v >= lo - 1e-12 && *v <= hi + 1e-12);
                }
            }
        }
    }
}
