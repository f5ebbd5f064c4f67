//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - handed back to the caller as parameter maps
//! - dumped as JSON by the CLI

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Canonical names of the five lineshape parameters, in vector order.
pub const PARAM_NAMES: [&str; 5] = ["I0", "A", "width", "f_center", "f_delta"];

/// Parameters of the double-Lorentzian lineshape.
///
/// `i0`, `width` are strictly positive and `a`, `f_delta` non-negative for any
/// vector produced by the optimizer; the fallback vector may use zeros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamVector {
    /// Baseline intensity.
    pub i0: f64,
    /// Amplitude of each dip.
    pub a: f64,
    /// Lorentzian half width at half maximum.
    pub width: f64,
    /// Midpoint between the two dips.
    pub f_center: f64,
    /// Distance between the two dip centers.
    pub f_delta: f64,
}

impl ParamVector {
    pub const fn new(i0: f64, a: f64, width: f64, f_center: f64, f_delta: f64) -> Self {
        Self {
            i0,
            a,
            width,
            f_center,
            f_delta,
        }
    }

    pub fn to_array(self) -> [f64; 5] {
        [self.i0, self.a, self.width, self.f_center, self.f_delta]
    }

    pub fn from_array(v: [f64; 5]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Half-open sample interval `[start, end)` where the trace dipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DipSegment {
    pub start: usize,
    pub end: usize,
}

impl DipSegment {
    /// Frequency span `freq[end] - freq[start]`.
    pub fn span(&self, freq: &[f64]) -> f64 {
        freq[self.end] - freq[self.start]
    }

    /// Frequency midpoint of the segment boundaries.
    pub fn midpoint(&self, freq: &[f64]) -> f64 {
        0.5 * (freq[self.start] + freq[self.end])
    }
}

/// Baseline and noise estimates taken from the resonance-free tails of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TailStats {
    /// Mean of the tail samples.
    pub baseline: f64,
    /// Population standard deviation of the tail samples.
    pub noise_std: f64,
    /// `max - min - 2 * noise_std`; may be negative for flat traces.
    pub amplitude: f64,
}

/// Which initial-guess branch a pixel took, keyed on its segment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentCase {
    None,
    Single,
    Pair,
    Many,
}

impl SegmentCase {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => SegmentCase::None,
            1 => SegmentCase::Single,
            2 => SegmentCase::Pair,
            _ => SegmentCase::Many,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SegmentCase::None => "no dip",
            SegmentCase::Single => "one dip",
            SegmentCase::Pair => "two dips",
            SegmentCase::Many => "3+ dips",
        }
    }
}

/// Fit outcome for a single pixel after the convergence gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelFit {
    pub params: ParamVector,
    /// Loss the gate judged this pixel by (pixel or batch MSE).
    pub loss: f64,
    pub converged: bool,
}

/// Per-pixel fit results reshaped to the scan grid.
///
/// Every matrix has shape `(rows, cols)`; entry `(r, c)` belongs to pixel `(r, c)`.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterMaps {
    pub i0: DMatrix<f64>,
    pub a: DMatrix<f64>,
    pub width: DMatrix<f64>,
    pub f_center: DMatrix<f64>,
    pub f_delta: DMatrix<f64>,
    /// `false` where the fit was replaced by the fallback vector.
    pub converged: DMatrix<bool>,
    pub loss: DMatrix<f64>,
}

impl ParameterMaps {
    /// Build maps from fits laid out in row-major pixel order.
    pub fn from_pixel_fits(rows: usize, cols: usize, fits: &[PixelFit]) -> Result<Self, AppError> {
        if fits.len() != rows * cols {
            return Err(AppError::invalid_input(format!(
                "Expected {} pixel fits for a {rows}x{cols} grid, got {}.",
                rows * cols,
                fits.len()
            )));
        }

        let map = |f: fn(&PixelFit) -> f64| DMatrix::from_row_iterator(rows, cols, fits.iter().map(f));
        Ok(Self {
            i0: map(|p| p.params.i0),
            a: map(|p| p.params.a),
            width: map(|p| p.params.width),
            f_center: map(|p| p.params.f_center),
            f_delta: map(|p| p.params.f_delta),
            converged: DMatrix::from_row_iterator(rows, cols, fits.iter().map(|p| p.converged)),
            loss: map(|p| p.loss),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.i0.shape()
    }

    /// Look up a parameter map by its canonical name (see [`PARAM_NAMES`]).
    pub fn get(&self, name: &str) -> Option<&DMatrix<f64>> {
        match name {
            "I0" => Some(&self.i0),
            "A" => Some(&self.a),
            "width" => Some(&self.width),
            "f_center" => Some(&self.f_center),
            "f_delta" => Some(&self.f_delta),
            _ => None,
        }
    }

    pub fn params_at(&self, row: usize, col: usize) -> ParamVector {
        ParamVector::new(
            self.i0[(row, col)],
            self.a[(row, col)],
            self.width[(row, col)],
            self.f_center[(row, col)],
            self.f_delta[(row, col)],
        )
    }

    pub fn converged_count(&self) -> usize {
        self.converged.iter().filter(|c| **c).count()
    }
}
