//! Convergence gate: accept a refined fit or fall back to defaults.

use crate::domain::{FitConfig, LossScope, PixelFit};
use crate::fit::optimizer::BatchFit;

/// Judge every pixel of an optimized batch.
///
/// A pixel passes when its loss is finite and at most `error_threshold`,
/// where the loss is the pixel's own MSE or the batch MSE depending on
/// `loss_scope`. Failing pixels (including non-finite parameters) are
/// replaced by `default_values` with `converged = false`.
pub fn apply_gate(batch_index: usize, batch: &BatchFit, config: &FitConfig) -> Vec<PixelFit> {
    let fits: Vec<PixelFit> = batch
        .params
        .iter()
        .zip(&batch.pixel_loss)
        .map(|(params, &pixel_loss)| {
            let loss = match config.loss_scope {
                LossScope::Pixel => pixel_loss,
                LossScope::Batch => batch.batch_loss,
            };
            let converged = params.is_finite() && loss.is_finite() && loss <= config.error_threshold;
            PixelFit {
                params: if converged { *params } else { config.default_values },
                loss,
                converged,
            }
        })
        .collect();

    let rejected = fits.iter().filter(|f| !f.converged).count();
    if rejected > 0 {
        log::warn!(
            "batch {batch_index}: {rejected}/{} pixels above error threshold {:.3e}, using default values",
            fits.len(),
            config.error_threshold
        );
    }
    fits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamVector;

    fn batch() -> BatchFit {
        BatchFit {
            params: vec![
                ParamVector::new(1.0, 0.15, 0.003, 2.87, 0.005),
                ParamVector::new(0.9, 0.1, 0.004, 2.871, 0.002),
            ],
            pixel_loss: vec![1e-5, 0.4],
            batch_loss: 0.200005,
        }
    }

    #[test]
    fn batch_scope_above_threshold_rejects_every_pixel() {
        let config = FitConfig {
            loss_scope: LossScope::Batch,
            ..FitConfig::default()
        };
        let fits = apply_gate(0, &batch(), &config);
        for fit in &fits {
            assert!(!fit.converged);
            assert_eq!(fit.params, config.default_values);
            assert_eq!(fit.loss, 0.200005);
        }
    }

    #[test]
    fn batch_scope_below_threshold_keeps_optimizer_output() {
        let config = FitConfig {
            loss_scope: LossScope::Batch,
            error_threshold: 0.5,
            ..FitConfig::default()
        };
        let input = batch();
        let fits = apply_gate(0, &input, &config);
        for (fit, params) in fits.iter().zip(&input.params) {
            assert!(fit.converged);
            assert_eq!(fit.params, *params);
        }
    }

    #[test]
    fn pixel_scope_judges_each_pixel() {
        let input = batch();
        let config = FitConfig::default();
        let fits = apply_gate(0, &input, &config);

        assert!(fits[0].converged);
        assert_eq!(fits[0].params, input.params[0]);
        assert_eq!(fits[0].loss, 1e-5);

        assert!(!fits[1].converged);
        assert_eq!(fits[1].params, config.default_values);
    }

    #[test]
    fn non_finite_loss_is_not_converged() {
        let input = BatchFit {
            params: vec![ParamVector::new(1.0, f64::INFINITY, 0.003, 2.87, 0.005)],
            pixel_loss: vec![f64::NAN],
            batch_loss: f64::NAN,
        };
        for scope in [LossScope::Pixel, LossScope::Batch] {
            let config = FitConfig {
                loss_scope: scope,
                error_threshold: f64::MAX,
                ..FitConfig::default()
            };
            let fits = apply_gate(0, &input, &config);
            assert!(!fits[0].converged);
            assert_eq!(fits[0].params, config.default_values);
        }
    }

    #[test]
    fn loss_exactly_at_threshold_passes() {
        let input = BatchFit {
            params: vec![ParamVector::new(1.0, 0.15, 0.003, 2.87, 0.005)],
            pixel_loss: vec![0.1],
            batch_loss: 0.1,
        };
        let fits = apply_gate(0, &input, &FitConfig::default());
        assert!(fits[0].converged);
    }
}
