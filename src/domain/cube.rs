//! Spectral cube and frequency axis.
//!
//! The cube is stored as one contiguous row-major buffer of shape
//! `(rows, cols, samples)`: pixel `(r, c)` owns the slice starting at
//! `(r * cols + c) * samples`.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::mean;

/// Strictly increasing, positive frequency samples shared by every trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FrequencyAxis {
    values: Vec<f64>,
}

impl FrequencyAxis {
    pub fn new(values: Vec<f64>) -> Result<Self, AppError> {
        if values.len() < 2 {
            return Err(AppError::invalid_input("Frequency axis needs at least two samples."));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::invalid_input("Frequency axis contains non-finite values."));
        }
        // `f_center` is optimized in log space, so the axis must sit on the positive side.
        if values[0] <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "Frequency axis must be positive (first sample is {}).",
                values[0]
            )));
        }
        if let Some(i) = values.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AppError::invalid_input(format!(
                "Frequency axis must be strictly increasing (sample {} <= sample {}).",
                i + 1,
                i
            )));
        }
        Ok(Self { values })
    }

    /// `n` evenly spaced samples over `[min, max]`, endpoints included.
    pub fn linspace(min: f64, max: f64, n: usize) -> Result<Self, AppError> {
        if n < 2 {
            return Err(AppError::invalid_input("Frequency axis needs at least two samples."));
        }
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(AppError::invalid_input(format!(
                "Invalid frequency range: min={min}, max={max} (must be finite and max>min)."
            )));
        }
        let step = (max - min) / (n as f64 - 1.0);
        let mut values: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
        values[n - 1] = max;
        Self::new(values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }
}

impl TryFrom<Vec<f64>> for FrequencyAxis {
    type Error = AppError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FrequencyAxis> for Vec<f64> {
    fn from(axis: FrequencyAxis) -> Self {
        axis.values
    }
}

/// Intensity cube of shape `(rows, cols, samples)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCube {
    rows: usize,
    cols: usize,
    samples: usize,
    data: Vec<f64>,
}

impl SpectralCube {
    /// Wrap a row-major buffer. Intensities must be finite and non-negative.
    pub fn new(rows: usize, cols: usize, samples: usize, data: Vec<f64>) -> Result<Self, AppError> {
        if rows == 0 || cols == 0 || samples == 0 {
            return Err(AppError::invalid_input(format!(
                "Cube dimensions must be non-zero (got {rows}x{cols}x{samples})."
            )));
        }
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(samples))
            .ok_or_else(|| AppError::invalid_input(format!("Cube dimensions {rows}x{cols}x{samples} overflow.")))?;
        if data.len() != expected {
            return Err(AppError::invalid_input(format!(
                "Cube buffer has {} values, expected {rows}x{cols}x{samples}={expected}.",
                data.len()
            )));
        }
        if let Some(i) = data.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(AppError::invalid_input(format!(
                "Cube intensity at flat index {i} is negative or non-finite ({}).",
                data[i]
            )));
        }
        Ok(Self {
            rows,
            cols,
            samples,
            data,
        })
    }

    /// Build a cube from per-pixel traces in row-major pixel order.
    pub fn from_traces(rows: usize, cols: usize, traces: &[Vec<f64>]) -> Result<Self, AppError> {
        if rows.checked_mul(cols) != Some(traces.len()) {
            return Err(AppError::invalid_input(format!(
                "Expected {rows}x{cols} traces, got {}.",
                traces.len()
            )));
        }
        let samples = traces.first().map(Vec::len).unwrap_or(0);
        if let Some(i) = traces.iter().position(|t| t.len() != samples) {
            return Err(AppError::invalid_input(format!(
                "Trace {i} has {} samples, expected {samples}.",
                traces[i].len()
            )));
        }
        let data = traces.iter().flatten().copied().collect();
        Self::new(rows, cols, samples, data)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.samples)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Trace of pixel `(row, col)`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the grid.
    pub fn trace(&self, row: usize, col: usize) -> &[f64] {
        assert!(row < self.rows && col < self.cols, "pixel ({row}, {col}) outside grid");
        self.trace_at(row * self.cols + col)
    }

    /// Trace of the pixel with flat index `row * cols + col`.
    pub fn trace_at(&self, pixel: usize) -> &[f64] {
        let start = pixel * self.samples;
        &self.data[start..start + self.samples]
    }

    pub fn traces(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.samples)
    }

    /// Copy of the cube where every trace is divided by its own maximum.
    ///
    /// Traces whose maximum is zero are left as-is.
    pub fn normalized_by_max(&self) -> Self {
        let mut data = self.data.clone();
        for trace in data.chunks_exact_mut(self.samples) {
            let peak = trace.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if peak > 0.0 {
                trace.iter_mut().for_each(|v| *v /= peak);
            }
        }
        Self { data, ..*self }
    }
}
