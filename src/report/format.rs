//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation.

use chrono::Local;

use crate::app::pipeline::FitOutput;
use crate::domain::{FitConfig, FrequencyAxis, PARAM_NAMES, SegmentCase, SpectralCube};
use crate::fit::PixelInspection;
use crate::report::{MapStats, NV_ZERO_FIELD_GHZ, frequency_shift_map, raw_contrast_map};

/// Format the run summary: input shape, settings, segment cases, map statistics.
pub fn format_run_summary(cube: &SpectralCube, axis: &FrequencyAxis, output: &FitOutput, config: &FitConfig) -> String {
    let mut out = String::new();
    let (rows, cols, samples) = cube.shape();
    let summary = &output.summary;

    out.push_str("=== odmr-fit - double-Lorentzian ODMR fit ===\n");
    out.push_str(&format!("Generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!(
        "Cube: {rows}x{cols} pixels | {samples} samples | f=[{:.4}, {:.4}]\n",
        axis.min(),
        axis.max()
    ));
    out.push_str(&format!(
        "Optimizer: epochs={} lr={:.1e} batch_size={} batches={}\n",
        config.epochs, config.learning_rate, config.batch_size, summary.batches
    ));
    out.push_str(&format!(
        "Gate: error_threshold={:.3e} loss_scope={:?}\n",
        config.error_threshold, config.loss_scope
    ));

    out.push_str("\nSegment cases:\n");
    let cases = &summary.cases;
    for case in [SegmentCase::None, SegmentCase::Single, SegmentCase::Pair, SegmentCase::Many] {
        out.push_str(&format!("  {:<10} {:>8}\n", case.display_name(), cases.count(case)));
    }

    out.push_str(&format!(
        "\nConverged: {}/{} ({:.1}%)\n",
        summary.converged,
        summary.pixels,
        percent(summary.converged, summary.pixels)
    ));

    out.push_str("\nParameter maps (converged pixels):\n");
    out.push_str(&stats_header());
    for name in PARAM_NAMES {
        if let Some(map) = output.maps.get(name) {
            out.push_str(&stats_row(name, MapStats::of_masked(map, &output.maps.converged)));
        }
    }
    let shift = frequency_shift_map(&output.maps, NV_ZERO_FIELD_GHZ);
    out.push_str(&stats_row("f_shift", MapStats::of_masked(&shift, &output.maps.converged)));

    out.push_str("\nRaw data (all pixels):\n");
    out.push_str(&stats_header());
    out.push_str(&stats_row("contrast", MapStats::of(&raw_contrast_map(cube))));
    out.push_str(&stats_row("loss", MapStats::of(&output.maps.loss)));

    out
}

/// Format a single-pixel inspection.
pub fn format_inspection(inspection: &PixelInspection, axis: &FrequencyAxis) -> String {
    let mut out = String::new();
    let seg = &inspection.segmentation;
    let freq = axis.as_slice();

    out.push_str("=== odmr-fit - pixel inspection ===\n");
    out.push_str(&format!(
        "Tail stats: baseline={:.5} noise_std={:.5} amplitude={:.5}\n",
        seg.stats.baseline, seg.stats.noise_std, seg.stats.amplitude
    ));
    out.push_str(&format!(
        "Thresholds: low={:.5} high={:.5}\n",
        seg.threshold_low, seg.threshold_high
    ));

    out.push_str(&format!("\nSegments ({}):\n", seg.segments.len()));
    for s in &seg.segments {
        out.push_str(&format!(
            "  [{:>4}, {:>4})  f=[{:.5}, {:.5}]\n",
            s.start, s.end, freq[s.start], freq[s.end]
        ));
    }

    out.push_str(&format!("\nInitial guess ({}):\n", inspection.guess.case.display_name()));
    out.push_str(&format_params(&inspection.guess.params.to_array()));

    let verdict = if inspection.fit.converged { "converged" } else { "rejected, using defaults" };
    out.push_str(&format!("\nFit ({verdict}, loss={:.3e}):\n", inspection.fit.loss));
    out.push_str(&format_params(&inspection.fit.params.to_array()));

    out
}

fn format_params(values: &[f64; 5]) -> String {
    PARAM_NAMES
        .iter()
        .zip(values)
        .map(|(name, v)| format!("  {name:<9} {v:>14.6e}\n"))
        .collect()
}

fn stats_header() -> String {
    format!(
        "  {:<9} {:>6} {:>13} {:>13} {:>13} {:>13}\n",
        "map", "n", "min", "max", "mean", "std"
    )
}

fn stats_row(name: &str, stats: Option<MapStats>) -> String {
    match stats {
        Some(s) => format!(
            "  {name:<9} {:>6} {:>13.6e} {:>13.6e} {:>13.6e} {:>13.6e}\n",
            s.count, s.min, s.max, s.mean, s.std
        ),
        None => format!("  {name:<9} {:>6} {:>13}\n", 0, "-"),
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { 100.0 * part as f64 / whole as f64 }
}
