//! Uniform white noise and box smoothing.

use rayon::prelude::*;

use crate::error::SynthError;
use crate::grid::{checked_len, clamp_unit, ScalarGrid};
use crate::prng::RandomSource;

/// Generates a `size x size` grid of independent uniform draws in [0, 1).
///
/// Draws are taken in row-major order, so a seeded source reproduces the
/// same grid exactly. Returns `SynthError::InvalidDimensions` if `size` is 0.
pub fn generate_noise<R>(size: usize, rng: &mut R) -> Result<ScalarGrid, SynthError>
where
    R: RandomSource + ?Sized,
{
    let len = checked_len(size, size)?;
    let data = (0..len).map(|_| rng.next_f64()).collect();
    Ok(ScalarGrid::from_unit_data(size, size, data))
}

/// Replaces each cell with the mean of the `(2 * window + 1)^2` square around it.
///
/// Neighbourhoods are truncated at the grid edge: only in-bounds cells are
/// averaged, nothing wraps or pads. A rectangle of in-bounds cells factors
/// into a row interval times a column interval, so the mean is computed as a
/// horizontal pass followed by a vertical pass over prefix sums.
/// `window == 0` returns an unchanged copy.
pub fn smooth(noise: &ScalarGrid, window: usize) -> ScalarGrid {
    if window == 0 {
        return noise.clone();
    }
    let (w, h) = noise.dimensions();

    let mut horizontal = vec![0.0; w * h];
    horizontal
        .par_chunks_mut(w)
        .zip(noise.data().par_chunks(w))
        .for_each(|(out, row)| box_mean_1d(row, window, out));

    let mut columns = vec![0.0; w * h];
    columns
        .par_chunks_mut(h)
        .enumerate()
        .for_each(|(x, out)| {
            let column: Vec<f64> = (0..h).map(|y| horizontal[y * w + x]).collect();
            box_mean_1d(&column, window, out);
        });

    let data = (0..w * h)
        .map(|i| clamp_unit(columns[(i % w) * h + i / w]))
        .collect();
    ScalarGrid::from_unit_data(w, h, data)
}

/// Truncated moving average of `input` with the given radius, written to `out`.
fn box_mean_1d(input: &[f64], radius: usize, out: &mut [f64]) {
    let n = input.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &v in input {
        acc += v;
        prefix.push(acc);
    }
    for (i, slot) in out.iter_mut().enumerate() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius + 1).min(n);
        *slot = (prefix[hi] - prefix[lo]) / (hi - lo) as f64;
    }
}
