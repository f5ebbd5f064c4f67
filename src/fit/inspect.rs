//! Full pipeline for one trace, keeping every intermediate.

use serde::Serialize;

use crate::domain::{FitConfig, FrequencyAxis, PixelFit};
use crate::error::AppError;
use crate::fit::gate::apply_gate;
use crate::fit::guess::{InitialGuess, guess_pixel};
use crate::fit::optimizer::{OptimizerSettings, optimize_batch};
use crate::fit::segment::Segmentation;
use crate::models::evaluate;

/// Everything the pipeline computed for a single pixel.
#[derive(Debug, Clone, Serialize)]
pub struct PixelInspection {
    pub segmentation: Segmentation,
    pub guess: InitialGuess,
    /// Gated result; `fit.params` equals `default_values` when rejected.
    pub fit: PixelFit,
    /// Model evaluated at the initial guess.
    pub guess_curve: Vec<f64>,
    /// Model evaluated at the gated parameters.
    pub fit_curve: Vec<f64>,
}

/// Segment, guess, optimize and gate one trace as a batch of size one.
pub fn inspect_pixel(trace: &[f64], axis: &FrequencyAxis, config: &FitConfig) -> Result<PixelInspection, AppError> {
    config.validate()?;
    config.validate_trace_len(axis.len())?;

    let pixel = guess_pixel(trace, axis, config)?;
    let settings = OptimizerSettings::from(config);
    let batch = optimize_batch(0, axis.as_slice(), &[trace], &[pixel.guess.params], &settings);
    let fit = apply_gate(0, &batch, config)
        .into_iter()
        .next()
        .ok_or_else(|| AppError::invalid_input("Optimizer returned no result."))?;

    Ok(PixelInspection {
        guess_curve: evaluate(axis.as_slice(), &pixel.guess.params),
        fit_curve: evaluate(axis.as_slice(), &fit.params),
        segmentation: pixel.segmentation,
        guess: pixel.guess,
        fit,
    })
}
