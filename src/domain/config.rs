//! Fit configuration.
//!
//! Defaults reproduce the settings the lab pipeline ran with: GHz frequency
//! units, tails of 5 samples, Adam at `5e-4` for 10k epochs.

use serde::{Deserialize, Serialize};

use crate::domain::ParamVector;
use crate::error::AppError;

/// Noise multipliers for the dip entry/exit thresholds.
///
/// A dip starts at a sample `<= min + low * noise_std` and ends at the first
/// later sample `>= min + high * noise_std`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMultipliers {
    pub low: f64,
    pub high: f64,
}

impl ThresholdMultipliers {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.low.is_finite() && self.high.is_finite()) {
            return Err(AppError::invalid_input("Threshold multipliers must be finite."));
        }
        if self.low < 0.0 || self.high < 0.0 {
            return Err(AppError::invalid_input(format!(
                "Threshold multipliers must be >= 0 (low={}, high={}).",
                self.low, self.high
            )));
        }
        if self.low > self.high {
            return Err(AppError::invalid_input(format!(
                "Low threshold ({}) must not exceed high threshold ({}).",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

impl Default for ThresholdMultipliers {
    fn default() -> Self {
        Self { low: 3.0, high: 5.0 }
    }
}

/// What to do with a dip that is still open when the trace ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingDipPolicy {
    /// Discard it (legacy behavior).
    #[default]
    Drop,
    /// Emit `[start, F - 1)` if that interval is non-empty.
    Close,
}

/// Which loss the convergence gate compares against `error_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossScope {
    /// Each pixel is judged by its own MSE.
    #[default]
    Pixel,
    /// Every pixel in a batch is judged by the shared batch MSE (legacy).
    Batch,
}

/// A full run's fitting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Samples taken from each end of a trace for baseline/noise estimation.
    pub tail: usize,
    pub thresholds: ThresholdMultipliers,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Maximum pixels optimized jointly; bounds the per-batch working set.
    pub batch_size: usize,
    /// Loss above which a fit is replaced by `default_values`.
    pub error_threshold: f64,
    pub default_values: ParamVector,
    /// Splitting assumed when only one dip is visible (frequency-axis units).
    pub splitting_prior: f64,
    pub loss_scope: LossScope,
    pub trailing_dip: TrailingDipPolicy,
    /// Value substituted for non-positive initial guesses before taking logs.
    pub log_floor: f64,
    /// Optimize independent batches concurrently.
    pub parallel_batches: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            tail: 5,
            thresholds: ThresholdMultipliers::default(),
            learning_rate: 5e-4,
            epochs: 10_000,
            batch_size: 300_000,
            error_threshold: 0.1,
            default_values: ParamVector::new(1.0, 0.0, 1.0, 2.87, 0.0),
            splitting_prior: 0.003,
            loss_scope: LossScope::Pixel,
            trailing_dip: TrailingDipPolicy::Drop,
            log_floor: 1e-12,
            parallel_batches: false,
        }
    }
}

impl FitConfig {
    /// Check every field that does not depend on the data shape.
    ///
    /// The `2 * tail <= samples` check happens once the trace length is known.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.tail == 0 {
            return Err(AppError::invalid_input("Tail size must be >= 1."));
        }
        self.thresholds.validate()?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::invalid_input(format!(
                "Learning rate must be finite and > 0 (got {}).",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(AppError::invalid_input("Epochs must be >= 1."));
        }
        if self.batch_size == 0 {
            return Err(AppError::invalid_input("Batch size must be >= 1."));
        }
        if !(self.error_threshold.is_finite() && self.error_threshold > 0.0) {
            return Err(AppError::invalid_input(format!(
                "Error threshold must be finite and > 0 (got {}).",
                self.error_threshold
            )));
        }
        if !self.default_values.is_finite() {
            return Err(AppError::invalid_input("Default values must be finite."));
        }
        if !(self.splitting_prior.is_finite() && self.splitting_prior > 0.0) {
            return Err(AppError::invalid_input(format!(
                "Splitting prior must be finite and > 0 (got {}).",
                self.splitting_prior
            )));
        }
        if !(self.log_floor.is_finite() && self.log_floor > 0.0) {
            return Err(AppError::invalid_input(format!(
                "Log floor must be finite and > 0 (got {}).",
                self.log_floor
            )));
        }
        Ok(())
    }

    /// Check that `2 * tail` samples fit into a trace of length `samples`.
    pub fn validate_trace_len(&self, samples: usize) -> Result<(), AppError> {
        check_tail(self.tail, samples)
    }
}

pub(crate) fn check_tail(tail: usize, samples: usize) -> Result<(), AppError> {
    if tail == 0 {
        return Err(AppError::invalid_input("Tail size must be >= 1."));
    }
    if tail.saturating_mul(2) > samples {
        return Err(AppError::invalid_input(format!(
            "Trace length ({samples}) must be at least two times the tail length ({tail})."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FitConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_each_bad_field() {
        let bad: Vec<FitConfig> = vec![
            FitConfig { tail: 0, ..FitConfig::default() },
            FitConfig {
                thresholds: ThresholdMultipliers { low: 5.0, high: 3.0 },
                ..FitConfig::default()
            },
            FitConfig {
                thresholds: ThresholdMultipliers { low: -1.0, high: 3.0 },
                ..FitConfig::default()
            },
            FitConfig { learning_rate: 0.0, ..FitConfig::default() },
            FitConfig { epochs: 0, ..FitConfig::default() },
            FitConfig { batch_size: 0, ..FitConfig::default() },
            FitConfig { error_threshold: -0.1, ..FitConfig::default() },
            FitConfig { splitting_prior: 0.0, ..FitConfig::default() },
            FitConfig { log_floor: 0.0, ..FitConfig::default() },
            FitConfig {
                default_values: ParamVector::new(1.0, f64::NAN, 1.0, 2.87, 0.0),
                ..FitConfig::default()
            },
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput, "{config:?}");
        }
    }

    #[test]
    fn equal_thresholds_are_allowed() {
        let t = ThresholdMultipliers { low: 2.0, high: 2.0 };
        t.validate().unwrap();
    }

    #[test]
    fn tail_must_fit_twice() {
        let config = FitConfig { tail: 5, ..FitConfig::default() };
        config.validate_trace_len(10).unwrap();
        assert!(config.validate_trace_len(9).is_err());
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let config: FitConfig =
            serde_json::from_str(r#"{"epochs": 50, "loss_scope": "batch", "thresholds": {"low": 1.0, "high": 2.0}}"#)
                .unwrap();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.loss_scope, LossScope::Batch);
        assert_eq!(config.thresholds, ThresholdMultipliers { low: 1.0, high: 2.0 });
        assert_eq!(config.tail, 5);
        assert_eq!(config.trailing_dip, TrailingDipPolicy::Drop);
    }
}
