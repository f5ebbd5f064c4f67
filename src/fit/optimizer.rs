//! Batched gradient-descent refinement of initial guesses.
//!
//! Given:
//! - a shared frequency axis `f_j`
//! - a batch of traces `y_ij` (one row per pixel)
//! - one initial `ParamVector` per pixel
//!
//! we minimize the batch mean squared error
//!
//! ```text
//! L = 1/(B·F) Σ_i Σ_j (I(f_j; p_i) - y_ij)²
//! ```
//!
//! over `θ_i = ln(p_i)` with Adam for a fixed number of epochs. Working in
//! log space keeps every parameter strictly positive without box
//! constraints; `p = exp(θ)` is applied before every model evaluation and
//! before results are reported. The gradient w.r.t. `θ` is the analytic model
//! gradient scaled by `p` (chain rule).

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{FitConfig, ParamVector};
use crate::math::{AdamParams, AdamState};
use crate::models::{double_lorentzian_with_partials, mse};

/// Log a loss checkpoint every this many epochs.
const LOG_EVERY: usize = 1000;

/// Optimizer settings derived from the fit configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub learning_rate: f64,
    pub epochs: usize,
    pub log_floor: f64,
}

impl From<&FitConfig> for OptimizerSettings {
    fn from(config: &FitConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            log_floor: config.log_floor,
        }
    }
}

/// Refined parameters for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFit {
    pub params: Vec<ParamVector>,
    /// Each pixel's own MSE at its final parameters.
    pub pixel_loss: Vec<f64>,
    /// Batch-wide MSE at the final parameters.
    pub batch_loss: f64,
}

/// Per-batch scratch buffers.
///
/// Owned by one `optimize_batch` call and released when it returns.
struct BatchWorkspace {
    /// `B × 5` log-parameters.
    theta: DMatrix<f64>,
    /// `B × 5` gradient of the batch loss w.r.t. `theta`.
    grad: DMatrix<f64>,
    /// `B × F` measured intensities.
    intensity: DMatrix<f64>,
    adam: AdamState,
}

impl BatchWorkspace {
    fn new(traces: &[&[f64]], guesses: &[ParamVector], samples: usize, settings: &OptimizerSettings) -> Self {
        let rows = traces.len();
        let floor = settings.log_floor;
        let theta = DMatrix::from_fn(rows, 5, |i, k| guesses[i].to_array()[k].max(floor).ln());
        let intensity = DMatrix::from_fn(rows, samples, |i, j| traces[i][j]);
        Self {
            theta,
            grad: DMatrix::zeros(rows, 5),
            intensity,
            adam: AdamState::new(rows, 5, AdamParams::with_learning_rate(settings.learning_rate)),
        }
    }

    fn params(&self, row: usize) -> ParamVector {
        let t = self.theta.row(row);
        ParamVector::new(t[0].exp(), t[1].exp(), t[2].exp(), t[3].exp(), t[4].exp())
    }

    /// Fill `grad` with `∂L/∂θ` and return the batch loss at the current `theta`.
    fn evaluate(&mut self, freq: &[f64]) -> f64 {
        let rows = self.theta.nrows();
        let scale = 1.0 / (rows * freq.len()) as f64;

        let ws = &*self;
        let per_row: Vec<(f64, [f64; 5])> = (0..rows)
            .into_par_iter()
            .map(|i| ws.row_terms(i, freq))
            .collect();

        // Summed in row order so the loss is independent of thread scheduling.
        let mut sse = 0.0;
        for (i, (row_sse, g)) in per_row.into_iter().enumerate() {
            sse += row_sse;
            for (k, gk) in g.into_iter().enumerate() {
                self.grad[(i, k)] = 2.0 * scale * gk;
            }
        }

        sse * scale
    }

    /// Squared error of one pixel and `Σ_j r_j ∂I/∂θ_k` for that pixel.
    fn row_terms(&self, row: usize, freq: &[f64]) -> (f64, [f64; 5]) {
        let p = self.params(row);
        let mut sse = 0.0;
        let mut g = [0.0; 5];
        for (j, &f) in freq.iter().enumerate() {
            let (value, partials) = double_lorentzian_with_partials(f, &p);
            let r = value - self.intensity[(row, j)];
            sse += r * r;
            for (gk, dk) in g.iter_mut().zip(partials) {
                *gk += r * dk;
            }
        }
        for (gk, pk) in g.iter_mut().zip(p.to_array()) {
            *gk *= pk;
        }
        (sse, g)
    }

    fn step(&mut self) {
        self.adam.update(&mut self.theta, &self.grad);
    }
}

/// Refine every guess in the batch for exactly `settings.epochs` Adam steps.
///
/// `traces[i]` must have the same length as `freq` and pairs with `guesses[i]`.
/// Non-positive guesses are lifted to `log_floor` before taking logs.
///
/// # Panics
/// Panics if `traces` and `guesses` differ in length or a trace does not match `freq`.
pub fn optimize_batch(
    batch_index: usize,
    freq: &[f64],
    traces: &[&[f64]],
    guesses: &[ParamVector],
    settings: &OptimizerSettings,
) -> BatchFit {
    assert_eq!(traces.len(), guesses.len(), "one guess per trace");
    assert!(traces.iter().all(|t| t.len() == freq.len()), "trace length must match axis");

    if traces.is_empty() {
        return BatchFit {
            params: Vec::new(),
            pixel_loss: Vec::new(),
            batch_loss: 0.0,
        };
    }

    let mut ws = BatchWorkspace::new(traces, guesses, freq.len(), settings);
    log::info!(
        "batch {batch_index}: optimizing {} pixels for {} epochs",
        traces.len(),
        settings.epochs
    );

    for epoch in 0..settings.epochs {
        let loss = ws.evaluate(freq);
        if epoch % LOG_EVERY == 0 {
            log::debug!("batch {batch_index} epoch {epoch}: loss={loss:.6e}");
        }
        ws.step();
    }

    let params: Vec<ParamVector> = (0..traces.len()).map(|i| ws.params(i)).collect();
    let pixel_loss: Vec<f64> = params
        .iter()
        .zip(traces)
        .map(|(p, trace)| if p.is_finite() { mse(freq, trace, p) } else { f64::NAN })
        .collect();
    let batch_loss = pixel_loss.iter().sum::<f64>() / pixel_loss.len() as f64;

    log::info!("batch {batch_index}: final loss={batch_loss:.6e}");

    BatchFit {
        params,
        pixel_loss,
        batch_loss,
    }
}
