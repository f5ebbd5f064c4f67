//! Dip segmentation of a single trace.
//!
//! Thresholds adapt to each trace: both sit a multiple of the tail noise
//! above the trace minimum. A dip opens at the first sample at or below the
//! low threshold and closes at the next sample at or above the high one, so
//! the gap between the two thresholds acts as hysteresis against noise
//! chattering around a single level.

use serde::Serialize;

use crate::domain::{DipSegment, TailStats, ThresholdMultipliers, TrailingDipPolicy, check_tail};
use crate::error::AppError;
use crate::math::{mean, min_max, population_std};

/// Segments found in one trace plus the thresholds that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub segments: Vec<DipSegment>,
    pub threshold_low: f64,
    pub threshold_high: f64,
    pub stats: TailStats,
}

/// Baseline, noise and amplitude estimates from the first and last `tail` samples.
pub fn tail_stats(trace: &[f64], tail: usize) -> Result<TailStats, AppError> {
    check_tail(tail, trace.len())?;

    let tails: Vec<f64> = trace[..tail]
        .iter()
        .chain(&trace[trace.len() - tail..])
        .copied()
        .collect();
    let noise_std = population_std(&tails);
    let baseline = mean(&tails);
    let (lo, hi) = min_max(trace).ok_or_else(|| AppError::invalid_input("Empty trace."))?;

    Ok(TailStats {
        baseline,
        noise_std,
        amplitude: hi - lo - 2.0 * noise_std,
    })
}

/// Detect dip intervals in `trace`.
///
/// Returned segments are ordered, non-overlapping and satisfy `start < end`.
pub fn segment_dips(
    trace: &[f64],
    tail: usize,
    thresholds: ThresholdMultipliers,
    trailing: TrailingDipPolicy,
) -> Result<Segmentation, AppError> {
    thresholds.validate()?;
    if trace.iter().any(|v| !v.is_finite()) {
        return Err(AppError::invalid_input("Trace contains non-finite samples."));
    }
    let stats = tail_stats(trace, tail)?;
    let (floor, _) = min_max(trace).ok_or_else(|| AppError::invalid_input("Empty trace."))?;

    let threshold_low = floor + thresholds.low * stats.noise_std;
    let threshold_high = floor + thresholds.high * stats.noise_std;

    let segments = scan_dips(trace, threshold_low, threshold_high, trailing);

    Ok(Segmentation {
        segments,
        threshold_low,
        threshold_high,
        stats,
    })
}

/// Hysteresis scan of `trace` against absolute thresholds.
pub fn scan_dips(
    trace: &[f64],
    threshold_low: f64,
    threshold_high: f64,
    trailing: TrailingDipPolicy,
) -> Vec<DipSegment> {
    let mut segments = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &v) in trace.iter().enumerate() {
        match open {
            Some(start) if v >= threshold_high => {
                segments.push(DipSegment { start, end: i });
                open = None;
            }
            None if v <= threshold_low => open = Some(i),
            _ => {}
        }
    }

    if let Some(start) = open {
        let last = trace.len() - 1;
        match trailing {
            TrailingDipPolicy::Close if last > start => {
                segments.push(DipSegment { start, end: last });
            }
            _ => log::trace!("dropping dip left open at sample {start}"),
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    use super::*;
    use crate::domain::ParamVector;
    use crate::models::evaluate;

    fn default_thresholds() -> ThresholdMultipliers {
        ThresholdMultipliers { low: 3.0, high: 5.0 }
    }

    fn assert_well_formed(segments: &[DipSegment], len: usize) {
        for s in segments {
            assert!(s.start < s.end, "{s:?}");
            assert!(s.end < len, "{s:?}");
        }
        for w in segments.windows(2) {
            assert!(w[0].end <= w[1].start, "overlap: {w:?}");
        }
    }

    #[test]
    fn tail_stats_use_both_ends() {
        let trace = [1.0, 3.0, 0.0, 0.0, 0.0, 5.0, 7.0];
        let stats = tail_stats(&trace, 2).unwrap();
        assert!((stats.baseline - 4.0).abs() < 1e-12);
        assert!((stats.noise_std - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((stats.amplitude - (7.0 - 2.0 * 5.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn finds_two_dips_in_clean_double_dip() {
        let freq: Vec<f64> = (0..100).map(|i| 2.85 + 0.04 * i as f64 / 99.0).collect();
        let trace = evaluate(&freq, &ParamVector::new(1.0, 0.15, 0.003, 2.87, 0.005));
        let seg = segment_dips(&trace, 5, default_thresholds(), TrailingDipPolicy::Drop).unwrap();

        assert_eq!(seg.segments.len(), 2, "{:?}", seg.segments);
        assert!(seg.threshold_low <= seg.threshold_high);
        assert!(freq[seg.segments[0].start] < 2.87 && freq[seg.segments[1].end] > 2.87);
        assert_well_formed(&seg.segments, trace.len());
    }

    #[test]
    fn no_sample_below_low_threshold_means_empty() {
        let trace = [1.0, 0.9, 0.8, 0.85, 1.0, 0.95, 1.0];
        let segments = scan_dips(&trace, 0.5, 0.9, TrailingDipPolicy::Close);
        assert!(segments.is_empty());
    }

    #[test]
    fn hysteresis_ignores_chatter_between_thresholds() {
        // Enters at 0.1, wobbles between the thresholds, exits once at 0.9.
        let trace = [1.0, 0.1, 0.5, 0.3, 0.6, 0.2, 0.9, 1.0, 0.15, 0.95];
        let segments = scan_dips(&trace, 0.2, 0.8, TrailingDipPolicy::Drop);
        assert_eq!(
            segments,
            vec![DipSegment { start: 1, end: 6 }, DipSegment { start: 8, end: 9 }]
        );
    }

    #[test]
    fn trace_minimum_always_opens_a_dip() {
        // With non-negative multipliers the minimum sits at or below threshold_low.
        let trace = [1.0, 1.0, 0.7, 1.0, 1.0];
        let seg = segment_dips(&trace, 2, default_thresholds(), TrailingDipPolicy::Drop).unwrap();
        assert_eq!(seg.stats.noise_std, 0.0);
        assert_eq!(seg.segments, vec![DipSegment { start: 2, end: 3 }]);
    }

    #[test]
    fn trailing_open_dip_is_dropped_by_default() {
        // The right tail is part of the dip, so it never climbs back over threshold_high.
        let trace = [1.0, 1.0, 1.0, 1.0, 0.2, 0.1, 0.2, 0.3];
        let thresholds = ThresholdMultipliers { low: 1.0, high: 2.0 };
        let dropped = segment_dips(&trace, 2, thresholds, TrailingDipPolicy::Drop).unwrap();
        let closed = segment_dips(&trace, 2, thresholds, TrailingDipPolicy::Close).unwrap();

        assert!(dropped.segments.is_empty(), "{:?}", dropped.segments);
        assert_eq!(closed.segments.len(), 1);
        assert_eq!(closed.segments[0].end, trace.len() - 1);
        assert_well_formed(&closed.segments, trace.len());
    }

    #[test]
    fn rejects_invalid_inputs() {
        let trace = [1.0; 10];
        let ok = default_thresholds();
        assert!(segment_dips(&trace, 6, ok, TrailingDipPolicy::Drop).is_err());
        assert!(segment_dips(&trace, 0, ok, TrailingDipPolicy::Drop).is_err());
        let inverted = ThresholdMultipliers { low: 5.0, high: 3.0 };
        assert!(segment_dips(&trace, 2, inverted, TrailingDipPolicy::Drop).is_err());
        let negative = ThresholdMultipliers { low: -1.0, high: 3.0 };
        assert!(segment_dips(&trace, 2, negative, TrailingDipPolicy::Drop).is_err());
        segment_dips(&trace, 5, ok, TrailingDipPolicy::Drop).unwrap();
    }

    #[test]
    fn segments_are_ordered_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 0.05).unwrap();
        for _ in 0..200 {
            let len = rng.gen_range(4..80);
            let tail = rng.gen_range(1..=len / 2);
            let low = rng.gen_range(0.0..4.0);
            let high = low + rng.gen_range(0.0..4.0);
            let trace: Vec<f64> = (0..len).map(|_| 1.0 + noise.sample(&mut rng)).collect();
            let thresholds = ThresholdMultipliers { low, high };

            for policy in [TrailingDipPolicy::Drop, TrailingDipPolicy::Close] {
                let seg = segment_dips(&trace, tail, thresholds, policy).unwrap();
                assert_well_formed(&seg.segments, trace.len());
            }
        }
    }
}
