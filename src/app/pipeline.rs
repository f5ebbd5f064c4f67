//! Whole-cube fitting pipeline shared by every front-end.
//!
//! segment + guess (per pixel, parallel) -> batches -> optimize -> gate -> maps

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{FitConfig, FrequencyAxis, ParamVector, ParameterMaps, PixelFit, SegmentCase, SpectralCube};
use crate::error::AppError;
use crate::fit::{OptimizerSettings, apply_gate, guess_pixel, optimize_batch};

/// How many pixels took each initial-guess branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaseCounts {
    pub none: usize,
    pub single: usize,
    pub pair: usize,
    pub many: usize,
}

impl CaseCounts {
    fn record(&mut self, case: SegmentCase) {
        match case {
            SegmentCase::None => self.none += 1,
            SegmentCase::Single => self.single += 1,
            SegmentCase::Pair => self.pair += 1,
            SegmentCase::Many => self.many += 1,
        }
    }

    pub fn count(&self, case: SegmentCase) -> usize {
        match case {
            SegmentCase::None => self.none,
            SegmentCase::Single => self.single,
            SegmentCase::Pair => self.pair,
            SegmentCase::Many => self.many,
        }
    }

    pub fn total(&self) -> usize {
        self.none + self.single + self.pair + self.many
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub pixels: usize,
    pub batches: usize,
    pub converged: usize,
    pub cases: CaseCounts,
}

/// Result of [`fit_cube`].
#[derive(Debug, Clone, Serialize)]
pub struct FitOutput {
    pub maps: ParameterMaps,
    pub summary: FitSummary,
}

/// Fit every pixel of `cube` against `axis`.
pub fn fit_cube(cube: &SpectralCube, axis: &FrequencyAxis, config: &FitConfig) -> Result<FitOutput, AppError> {
    config.validate()?;
    if cube.samples() != axis.len() {
        return Err(AppError::invalid_input(format!(
            "Cube traces have {} samples but the frequency axis has {}.",
            cube.samples(),
            axis.len()
        )));
    }
    config.validate_trace_len(cube.samples())?;

    let (rows, cols, samples) = cube.shape();
    log::info!(
        "fitting {rows}x{cols} pixels with {samples} samples (batch_size={}, epochs={})",
        config.batch_size,
        config.epochs
    );

    // 1) Segmentation + initial guess, independent per pixel.
    let guesses = (0..cube.pixel_count())
        .into_par_iter()
        .map(|pixel| guess_pixel(cube.trace_at(pixel), axis, config).map(|g| g.guess))
        .collect::<Result<Vec<_>, AppError>>()?;

    let mut cases = CaseCounts::default();
    for g in &guesses {
        cases.record(g.case);
    }
    log::debug!(
        "segment cases: none={} single={} pair={} many={}",
        cases.none,
        cases.single,
        cases.pair,
        cases.many
    );

    // 2) Optimize + gate per batch.
    let params: Vec<ParamVector> = guesses.iter().map(|g| g.params).collect();
    let settings = OptimizerSettings::from(config);
    let pixel_count = cube.pixel_count();
    let batches = pixel_count.div_ceil(config.batch_size);

    let run_batch = |index: usize| -> Vec<PixelFit> {
        let start = index * config.batch_size;
        let end = (start + config.batch_size).min(pixel_count);
        let traces: Vec<&[f64]> = (start..end).map(|p| cube.trace_at(p)).collect();
        let batch = optimize_batch(index, axis.as_slice(), &traces, &params[start..end], &settings);
        apply_gate(index, &batch, config)
    };

    let fits: Vec<PixelFit> = if config.parallel_batches {
        (0..batches).into_par_iter().flat_map_iter(run_batch).collect()
    } else {
        (0..batches).flat_map(run_batch).collect()
    };

    // 3) Reshape into maps.
    let maps = ParameterMaps::from_pixel_fits(rows, cols, &fits)?;
    let summary = FitSummary {
        pixels: fits.len(),
        batches,
        converged: maps.converged_count(),
        cases,
    };
    log::info!(
        "fit finished: {}/{} pixels converged across {} batch(es)",
        summary.converged,
        summary.pixels,
        summary.batches
    );

    Ok(FitOutput { maps, summary })
}
