//! Synthetic ODMR cubes drawn from the double-Lorentzian model.
//!
//! Every pixel shares one ground-truth `ParamVector`; selected pixels are
//! "flat" (baseline only, no resonance) to mimic dark or off-sample regions.
//! Gaussian noise is seeded so runs are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;

use crate::domain::{FrequencyAxis, ParamVector, SpectralCube};
use crate::error::AppError;
use crate::models::evaluate;

/// Resonance used when the caller does not supply one: a split NV pair near zero field.
pub const DEFAULT_TRUTH: ParamVector = ParamVector::new(1.0, 0.15, 0.003, 2.87, 0.005);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticSpec {
    pub rows: usize,
    pub cols: usize,
    pub samples: usize,
    pub freq_min: f64,
    pub freq_max: f64,
    pub truth: ParamVector,
    /// Standard deviation of additive Gaussian noise; `0` disables noise.
    pub noise_std: f64,
    /// Flat pixel indices in row-major order.
    pub flat_pixels: Vec<usize>,
    pub seed: u64,
}

/// Generate a cube and its frequency axis.
///
/// Intensities are clamped at zero so noisy samples stay valid cube input.
pub fn generate_cube(spec: &SyntheticSpec) -> Result<(SpectralCube, FrequencyAxis), AppError> {
    let axis = FrequencyAxis::linspace(spec.freq_min, spec.freq_max, spec.samples)?;
    let pixels = spec.rows.checked_mul(spec.cols);
    let (Some(pixels), Some(len)) = (pixels, pixels.and_then(|n| n.checked_mul(axis.len()))) else {
        return Err(AppError::invalid_input(format!(
            "Synthetic cube {}x{}x{} is too large.",
            spec.rows, spec.cols, spec.samples
        )));
    };
    if !(spec.noise_std.is_finite() && spec.noise_std >= 0.0) {
        return Err(AppError::invalid_input(format!(
            "Noise std must be finite and >= 0 (got {}).",
            spec.noise_std
        )));
    }
    if let Some(&bad) = spec.flat_pixels.iter().find(|&&p| p >= pixels) {
        return Err(AppError::invalid_input(format!(
            "Flat pixel index {bad} outside a {}x{} grid.",
            spec.rows, spec.cols
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, spec.noise_std)
        .map_err(|e| AppError::invalid_input(format!("Noise distribution error: {e}")))?;

    let resonant = evaluate(axis.as_slice(), &spec.truth);
    let flat = vec![spec.truth.i0; axis.len()];

    let mut data = Vec::with_capacity(len);
    for pixel in 0..pixels {
        let clean = if spec.flat_pixels.contains(&pixel) { &flat } else { &resonant };
        data.extend(clean.iter().map(|&v| {
            let noisy = if spec.noise_std > 0.0 { v + noise.sample(&mut rng) } else { v };
            noisy.max(0.0)
        }));
    }

    log::debug!(
        "generated {}x{}x{} synthetic cube ({} flat pixels, noise_std={})",
        spec.rows,
        spec.cols,
        spec.samples,
        spec.flat_pixels.len(),
        spec.noise_std
    );

    let cube = SpectralCube::new(spec.rows, spec.cols, spec.samples, data)?;
    Ok((cube, axis))
}

/// Pick `round(fraction * pixels)` distinct flat pixel indices.
pub fn pick_flat_pixels(pixels: usize, fraction: f64, seed: u64) -> Result<Vec<usize>, AppError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(AppError::invalid_input(format!(
            "Flat fraction must lie in [0, 1] (got {fraction})."
        )));
    }
    let amount = ((pixels as f64) * fraction).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut picked = rand::seq::index::sample(&mut rng, pixels, amount.min(pixels)).into_vec();
    picked.sort_unstable();
    Ok(picked)
}
