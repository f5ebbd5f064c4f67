//! Adam first-order optimizer over a dense parameter matrix.
//!
//! Each matrix entry is an independent coordinate; the batch optimizer stores
//! one pixel per row and one (log-)parameter per column, so every pixel gets
//! its own moment estimates while the whole batch advances in lockstep.
//!
//! Update (bias corrected, as in Kingma & Ba):
//!
//! ```text
//! m = β1 m + (1 - β1) g
//! v = β2 v + (1 - β2) g²
//! θ -= lr · (m / (1 - β1^t)) / (sqrt(v / (1 - β2^t)) + ε)
//! ```

use nalgebra::DMatrix;

/// Adam hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamParams {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
}

impl AdamParams {
    /// Standard moment decay rates with the given learning rate.
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

/// Moment estimates for one parameter matrix.
#[derive(Debug, Clone)]
pub struct AdamState {
    params: AdamParams,
    m: DMatrix<f64>,
    v: DMatrix<f64>,
    step: i32,
    beta1_pow: f64,
    beta2_pow: f64,
}

impl AdamState {
    pub fn new(rows: usize, cols: usize, params: AdamParams) -> Self {
        Self {
            params,
            m: DMatrix::zeros(rows, cols),
            v: DMatrix::zeros(rows, cols),
            step: 0,
            beta1_pow: 1.0,
            beta2_pow: 1.0,
        }
    }

    pub fn step_count(&self) -> i32 {
        self.step
    }

    /// Apply one update to `theta` given its gradient.
    ///
    /// # Panics
    /// Panics if `theta` and `grad` do not match the state's shape.
    pub fn update(&mut self, theta: &mut DMatrix<f64>, grad: &DMatrix<f64>) {
        assert_eq!(theta.shape(), self.m.shape(), "theta shape mismatch");
        assert_eq!(grad.shape(), self.m.shape(), "gradient shape mismatch");

        let AdamParams {
            learning_rate,
            beta1,
            beta2,
            eps,
        } = self.params;

        self.step += 1;
        self.beta1_pow *= beta1;
        self.beta2_pow *= beta2;
        let c1 = 1.0 - self.beta1_pow;
        let c2 = 1.0 - self.beta2_pow;

        for (((t, &g), m), v) in theta
            .iter_mut()
            .zip(grad.iter())
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / c1;
            let v_hat = *v / c2;
            *t -= learning_rate * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction the first step is lr * sign(g) (up to eps).
        let mut theta = DMatrix::from_row_slice(1, 2, &[1.0, -1.0]);
        let grad = DMatrix::from_row_slice(1, 2, &[0.5, -200.0]);
        let mut adam = AdamState::new(1, 2, AdamParams::with_learning_rate(0.1));
        adam.update(&mut theta, &grad);

        assert!((theta[(0, 0)] - 0.9).abs() < 1e-6);
        assert!((theta[(0, 1)] + 0.9).abs() < 1e-6);
        assert_eq!(adam.step_count(), 1);
    }

    #[test]
    fn minimizes_independent_quadratics() {
        // f(x) = (x - target)^2 per entry.
        let targets = DMatrix::from_row_slice(2, 2, &[3.0, -2.0, 0.5, 10.0]);
        let mut theta = DMatrix::zeros(2, 2);
        let mut adam = AdamState::new(2, 2, AdamParams::with_learning_rate(0.05));

        for _ in 0..5000 {
            let grad = (&theta - &targets) * 2.0;
            adam.update(&mut theta, &grad);
        }

        for (x, t) in theta.iter().zip(targets.iter()) {
            assert!((x - t).abs() < 1e-3, "x={x}, target={t}");
        }
    }
}
