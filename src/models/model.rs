//! Double-Lorentzian dip lineshape.
//!
//! ```text
//! I(f) = I0 - A / (1 + u1²) - A / (1 + u2²)
//! u1 = (f_center - f_delta/2 - f) / width
//! u2 = (f_center + f_delta/2 - f) / width
//! ```
//!
//! The optimizer relies on two primitive operations:
//! - evaluate `I(f)` for a parameter vector
//! - evaluate `I(f)` together with its partial derivatives

use crate::domain::ParamVector;

/// Model intensity at frequency `f`.
pub fn double_lorentzian(f: f64, p: &ParamVector) -> f64 {
    let u1 = (p.f_center - 0.5 * p.f_delta - f) / p.width;
    let u2 = (p.f_center + 0.5 * p.f_delta - f) / p.width;
    p.i0 - p.a / (1.0 + u1 * u1) - p.a / (1.0 + u2 * u2)
}

/// Model intensity and `∂I/∂p` in `ParamVector` order
/// (`I0, A, width, f_center, f_delta`).
pub fn double_lorentzian_with_partials(f: f64, p: &ParamVector) -> (f64, [f64; 5]) {
    let u1 = (p.f_center - 0.5 * p.f_delta - f) / p.width;
    let u2 = (p.f_center + 0.5 * p.f_delta - f) / p.width;
    let d1 = 1.0 + u1 * u1;
    let d2 = 1.0 + u2 * u2;

    let value = p.i0 - p.a / d1 - p.a / d2;

    // d/du [-A / (1 + u²)] = 2 A u / (1 + u²)²
    let k1 = 2.0 * p.a * u1 / (d1 * d1);
    let k2 = 2.0 * p.a * u2 / (d2 * d2);
    let inv_w = 1.0 / p.width;

    let partials = [
        1.0,
        -1.0 / d1 - 1.0 / d2,
        -(k1 * u1 + k2 * u2) * inv_w,
        (k1 + k2) * inv_w,
        0.5 * (k2 - k1) * inv_w,
    ];
    (value, partials)
}

/// Model curve sampled on `freq`.
pub fn evaluate(freq: &[f64], p: &ParamVector) -> Vec<f64> {
    freq.iter().map(|&f| double_lorentzian(f, p)).collect()
}

/// Mean squared error between the model and a measured trace.
pub fn mse(freq: &[f64], trace: &[f64], p: &ParamVector) -> f64 {
    let sse: f64 = freq
        .iter()
        .zip(trace)
        .map(|(&f, &y)| {
            let r = double_lorentzian(f, p) - y;
            r * r
        })
        .sum();
    sse / freq.len() as f64
}
