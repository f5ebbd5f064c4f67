//! Initial parameter guesses from detected dip segments.
//!
//! Estimates per segment count:
//!
//! - 0 dips: generic guess spread over the whole axis
//! - 1 dip: two overlapping dips, split by the configured prior
//! - 2 dips: one Lorentzian per segment
//! - 3+ dips: averages over all segments (dispersion of midpoints as splitting)

use serde::Serialize;

use crate::domain::{DipSegment, FitConfig, FrequencyAxis, ParamVector, SegmentCase, TailStats};
use crate::error::AppError;
use crate::fit::segment::{Segmentation, segment_dips};
use crate::math::{mean, population_std};

/// Starting point for the optimizer plus the branch that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InitialGuess {
    pub params: ParamVector,
    pub case: SegmentCase,
}

/// Segmentation and initial guess for one pixel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelGuess {
    pub segmentation: Segmentation,
    pub guess: InitialGuess,
}

/// Build the initial guess for a trace whose segments and tail statistics are known.
pub fn initial_guess(
    freq: &[f64],
    segments: &[DipSegment],
    stats: &TailStats,
    splitting_prior: f64,
) -> InitialGuess {
    let case = SegmentCase::from_count(segments.len());
    let mut amplitude = stats.amplitude;

    let (width, f_center, f_delta) = match segments {
        [] => {
            let lo = freq[0];
            let hi = freq[freq.len() - 1];
            (1.0, mean(freq), (hi - lo) / 4.0)
        }
        [only] => {
            // A single visible dip is assumed to hide two overlapping ones.
            amplitude *= 0.5;
            (0.5 * only.span(freq), only.midpoint(freq), splitting_prior)
        }
        [first, second] => {
            let m1 = first.midpoint(freq);
            let m2 = second.midpoint(freq);
            (0.25 * (first.span(freq) + second.span(freq)), 0.5 * (m1 + m2), m2 - m1)
        }
        many => {
            let half_spans: Vec<f64> = many.iter().map(|s| 0.5 * s.span(freq)).collect();
            let midpoints: Vec<f64> = many.iter().map(|s| s.midpoint(freq)).collect();
            (mean(&half_spans), mean(&midpoints), population_std(&midpoints))
        }
    };

    log::trace!(
        "initial guess ({}): width={width:.4e} f_center={f_center:.6} f_delta={f_delta:.4e}",
        case.display_name()
    );

    InitialGuess {
        params: ParamVector::new(stats.baseline, amplitude, width, f_center, f_delta),
        case,
    }
}

/// Segment a trace and derive its initial guess.
pub fn guess_pixel(trace: &[f64], axis: &FrequencyAxis, config: &FitConfig) -> Result<PixelGuess, AppError> {
    if trace.len() != axis.len() {
        return Err(AppError::invalid_input(format!(
            "Trace has {} samples but the frequency axis has {}.",
            trace.len(),
            axis.len()
        )));
    }
    let segmentation = segment_dips(trace, config.tail, config.thresholds, config.trailing_dip)?;
    let guess = initial_guess(
        axis.as_slice(),
        &segmentation.segments,
        &segmentation.stats,
        config.splitting_prior,
    );
    Ok(PixelGuess { segmentation, guess })
}
