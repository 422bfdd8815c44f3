//! Metaball masks: scalar fields built from randomly placed radial sources.

use glam::DVec2;

use crate::error::SynthError;
use crate::grid::{checked_len, eval_rows, ScalarGrid};
use crate::prng::RandomSource;

/// Radial falloff kernel of an [`InfluenceSource`].
///
/// Both kernels equal 1 at the source, never increase with distance, and
/// tend to 0 far away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Falloff {
    /// `1 / (1 + (d / r)^2)`: long tails, soft overlapping blobs.
    #[default]
    InverseSquare,
    /// `exp(-(d / r)^2)`: compact blobs with sharp outer edges.
    Gaussian,
}

impl Falloff {
    /// All kernel names accepted by [`Falloff::from_name`].
    pub const NAMES: &'static [&'static str] = &["inverse_square", "gaussian"];

    /// Looks up a kernel by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "inverse_square" => Some(Falloff::InverseSquare),
            "gaussian" => Some(Falloff::Gaussian),
            _ => None,
        }
    }

    /// snake_case name of this kernel.
    pub fn name(self) -> &'static str {
        match self {
            Falloff::InverseSquare => "inverse_square",
            Falloff::Gaussian => "gaussian",
        }
    }

    /// Kernel value for a distance already divided by the radius.
    fn eval(self, scaled_distance: f64) -> f64 {
        let d2 = scaled_distance * scaled_distance;
        match self {
            Falloff::InverseSquare => 1.0 / (1.0 + d2),
            Falloff::Gaussian => (-d2).exp(),
        }
    }
}

/// How contributions from several sources merge at one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combine {
    /// Contributions add up, so nearby blobs fuse.
    #[default]
    Sum,
    /// The strongest source wins, so blobs keep their own outline.
    Max,
}

impl Combine {
    /// All combine names accepted by [`Combine::from_name`].
    pub const NAMES: &'static [&'static str] = &["sum", "max"];

    /// Looks up a combine rule by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Combine::Sum),
            "max" => Some(Combine::Max),
            _ => None,
        }
    }

    /// snake_case name of this rule.
    pub fn name(self) -> &'static str {
        match self {
            Combine::Sum => "sum",
            Combine::Max => "max",
        }
    }
}

/// A point source with a falloff radius, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluenceSource {
    pub position: DVec2,
    pub radius: f64,
}

impl InfluenceSource {
    /// Contribution of this source at `point`, in [0, 1].
    pub fn contribution(&self, point: DVec2, falloff: Falloff) -> f64 {
        falloff.eval(self.position.distance(point) / self.radius)
    }
}

/// Places `count` sources and evaluates their summed inverse-square field.
///
/// Each source's radius is `radius_scale * min(width, height)`. The result is
/// min-max normalized into [0, 1]. Returns `SynthError::InvalidDimensions`
/// for a zero width or height and `SynthError::InvalidParameter` for
/// `count == 0` or a non-positive `radius_scale`.
pub fn random_metaball<R>(
    width: usize,
    height: usize,
    count: usize,
    radius_scale: f64,
    rng: &mut R,
) -> Result<ScalarGrid, SynthError>
where
    R: RandomSource + ?Sized,
{
    random_metaball_with(
        width,
        height,
        count,
        radius_scale,
        Falloff::default(),
        Combine::default(),
        rng,
    )
}

/// [`random_metaball`] with an explicit kernel and combine rule.
pub fn random_metaball_with<R>(
    width: usize,
    height: usize,
    count: usize,
    radius_scale: f64,
    falloff: Falloff,
    combine: Combine,
    rng: &mut R,
) -> Result<ScalarGrid, SynthError>
where
    R: RandomSource + ?Sized,
{
    checked_len(width, height)?;
    if count == 0 {
        return Err(SynthError::invalid_parameter("count", count));
    }
    if !(radius_scale.is_finite() && radius_scale > 0.0) {
        return Err(SynthError::invalid_parameter("radius_scale", radius_scale));
    }

    let radius = radius_scale * width.min(height) as f64;
    let sources: Vec<InfluenceSource> = (0..count)
        .map(|_| InfluenceSource {
            position: DVec2::new(
                rng.next_f64() * width as f64,
                rng.next_f64() * height as f64,
            ),
            radius,
        })
        .collect();

    metaball_field(width, height, &sources, falloff, combine)
}

/// Evaluates a normalized field for an explicit set of sources.
///
/// The raw combined field is min-max normalized. When it is flat (a single
/// cell, or every cell equally covered) there is no range to stretch, so the
/// flat value is kept instead: the mean contribution per source, which is
/// already in [0, 1].
pub fn metaball_field(
    width: usize,
    height: usize,
    sources: &[InfluenceSource],
    falloff: Falloff,
    combine: Combine,
) -> Result<ScalarGrid, SynthError> {
    if sources.is_empty() {
        return Err(SynthError::invalid_parameter("count", 0));
    }
    if let Some(bad) = sources
        .iter()
        .find(|s| !(s.radius.is_finite() && s.radius > 0.0))
    {
        return Err(SynthError::invalid_parameter("radius", bad.radius));
    }

    let raw = eval_rows(width, height, |x, y| {
        let point = DVec2::new(x as f64, y as f64);
        let contributions = sources.iter().map(|s| s.contribution(point, falloff));
        match combine {
            Combine::Sum => contributions.sum(),
            Combine::Max => contributions.fold(0.0, f64::max),
        }
    })?;

    let (lo, hi) = raw
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    let data = if span > f64::EPSILON * hi.max(1.0) {
        raw.iter()
            .map(|v| ((v - lo) / span).clamp(0.0, 1.0))
            .collect()
    } else {
        let per_source = match combine {
            Combine::Sum => sources.len() as f64,
            Combine::Max => 1.0,
        };
        raw.iter()
            .map(|v| (v / per_source).clamp(0.0, 1.0))
            .collect()
    };
    Ok(ScalarGrid::from_unit_data(width, height, data))
}
