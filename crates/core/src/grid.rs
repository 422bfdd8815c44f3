//! Two-dimensional scalar grid with values in [0, 1].
//!
//! A `ScalarGrid` stores `width * height` f64 values in row-major layout.
//! Every constructor enforces the [0, 1] range, and there is no mutable
//! access: operations derive new grids instead of editing shared ones.

use rayon::prelude::*;

use crate::error::SynthError;

/// Checks that neither dimension is zero and that the cell count fits `usize`.
pub(crate) fn checked_len(width: usize, height: usize) -> Result<usize, SynthError> {
    if width == 0 || height == 0 {
        return Err(SynthError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(SynthError::InvalidDimensions { width, height })
}

/// A 2D grid of values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ScalarGrid {
    /// Creates a zero-filled grid.
    ///
    /// Returns `SynthError::InvalidDimensions` if either dimension is zero
    /// or if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self, SynthError> {
        Self::filled(width, height, 0.0)
    }

    /// Creates a grid filled with `value`, clamped to [0, 1].
    pub fn filled(width: usize, height: usize, value: f64) -> Result<Self, SynthError> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![clamp_unit(value); len],
        })
    }

    /// Creates a grid from a row-major data vector.
    ///
    /// Returns `SynthError::DimensionMismatch` if `data.len() != width * height`
    /// and `SynthError::ValueOutOfRange` for the first NaN or out-of-range value.
    pub fn from_data(width: usize, height: usize, data: Vec<f64>) -> Result<Self, SynthError> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(SynthError::DimensionMismatch {
                lhs_w: width,
                lhs_h: height,
                rhs_w: data.len(),
                rhs_h: 1,
            });
        }
        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(SynthError::ValueOutOfRange { index, value });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Evaluates `f(x, y)` for every cell, rows in parallel.
    ///
    /// Results are clamped to [0, 1]; NaN maps to 0.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Result<Self, SynthError>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let data = eval_rows(width, height, |x, y| clamp_unit(f(x, y)))?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wraps data produced inside the crate that is already known to be in range.
    pub(crate) fn from_unit_data(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        debug_assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
        Self {
            width,
            height,
            data,
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Read-only access to the underlying row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Gets the value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(
            x < self.width && y < self.height,
            "({x}, {y}) out of bounds for {}x{} grid",
            self.width,
            self.height
        );
        self.data[y * self.width + x]
    }

    /// Gets the value at `(x, y)` with coordinates clamped to the grid edge.
    pub fn get_clamped(&self, x: isize, y: isize) -> f64 {
        let xi = x.clamp(0, self.width as isize - 1) as usize;
        let yi = y.clamp(0, self.height as isize - 1) as usize;
        self.data[yi * self.width + xi]
    }

    /// Bilinearly interpolates at fractional coordinates, clamped to the edge.
    ///
    /// The result is a convex combination of four cells, so it stays in [0, 1].
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as isize, y0 as isize);
        let top = lerp(self.get_clamped(xi, yi), self.get_clamped(xi + 1, yi), fx);
        let bottom = lerp(
            self.get_clamped(xi, yi + 1),
            self.get_clamped(xi + 1, yi + 1),
            fx,
        );
        clamp_unit(lerp(top, bottom, fy))
    }

    /// Iterates over all cells yielding `(x, y, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.data.iter().enumerate().map(|(i, &v)| {
            let x = i % self.width;
            let y = i / self.width;
            (x, y, v)
        })
    }

    /// Arithmetic mean of all cells.
    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Population variance of all cells.
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.data.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / self.data.len() as f64
    }

    /// Smallest and largest cell values.
    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Returns `DimensionMismatch` unless `other` has the same dimensions.
    pub(crate) fn ensure_same_dimensions(&self, other: (usize, usize)) -> Result<(), SynthError> {
        if (self.width, self.height) != other {
            return Err(SynthError::DimensionMismatch {
                lhs_w: self.width,
                lhs_h: self.height,
                rhs_w: other.0,
                rhs_h: other.1,
            });
        }
        Ok(())
    }
}

/// Evaluates `f(x, y)` over a `width x height` row-major buffer, rows in parallel.
pub(crate) fn eval_rows<F>(width: usize, height: usize, f: F) -> Result<Vec<f64>, SynthError>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let len = checked_len(width, height)?;
    let mut data = vec![0.0; len];
    data.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            row.iter_mut()
                .enumerate()
                .for_each(|(x, cell)| *cell = f(x, y));
        });
    Ok(data)
}

/// Clamps to [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
