//! Reporting utilities: derived maps, map statistics, and formatted output.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{ParameterMaps, SpectralCube};
use crate::math::{mean, min_max, population_std};

pub mod format;

pub use format::*;

/// Zero-field splitting of the NV ground state in GHz.
pub const NV_ZERO_FIELD_GHZ: f64 = 2.87;

/// Per-pixel `max - min` of the raw trace.
pub fn raw_contrast_map(cube: &SpectralCube) -> DMatrix<f64> {
    per_pixel(cube, |trace| min_max(trace).map(|(lo, hi)| hi - lo).unwrap_or(0.0))
}

/// Per-pixel mean intensity (photoluminescence map).
pub fn mean_intensity_map(cube: &SpectralCube) -> DMatrix<f64> {
    per_pixel(cube, mean)
}

/// `f_center - reference` for every pixel.
pub fn frequency_shift_map(maps: &ParameterMaps, reference: f64) -> DMatrix<f64> {
    maps.f_center.map(|f| f - reference)
}

fn per_pixel(cube: &SpectralCube, f: impl Fn(&[f64]) -> f64) -> DMatrix<f64> {
    DMatrix::from_row_iterator(cube.rows(), cube.cols(), cube.traces().map(f))
}

/// Summary statistics over the finite entries of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl MapStats {
    /// Statistics over all finite entries; `None` if there are none.
    pub fn of(map: &DMatrix<f64>) -> Option<Self> {
        Self::from_values(map.iter().copied())
    }

    /// Statistics over finite entries where `mask` is true.
    pub fn of_masked(map: &DMatrix<f64>, mask: &DMatrix<bool>) -> Option<Self> {
        Self::from_values(map.iter().zip(mask.iter()).filter(|(_, m)| **m).map(|(v, _)| *v))
    }

    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
        let (min, max) = min_max(&finite)?;
        Some(Self {
            count: finite.len(),
            min,
            max,
            mean: mean(&finite),
            std: population_std(&finite),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamVector, PixelFit};

    fn cube() -> SpectralCube {
        SpectralCube::from_traces(
            1,
            2,
            &[vec![1.0, 0.5, 1.0, 0.9], vec![2.0, 2.0, 2.0, 2.0]],
        )
        .unwrap()
    }

    #[test]
    fn raw_contrast_and_mean_intensity() {
        let c = cube();
        let contrast = raw_contrast_map(&c);
        let intensity = mean_intensity_map(&c);

        assert_eq!(contrast.shape(), (1, 2));
        assert_eq!(contrast[(0, 0)], 0.5);
        assert_eq!(contrast[(0, 1)], 0.0);
        assert!((intensity[(0, 0)] - 0.85).abs() < 1e-12);
        assert_eq!(intensity[(0, 1)], 2.0);
    }

    #[test]
    fn frequency_shift_is_relative_to_reference() {
        let fits = [
            PixelFit {
                params: ParamVector::new(1.0, 0.1, 0.003, 2.875, 0.005),
                loss: 0.0,
                converged: true,
            },
            PixelFit {
                params: ParamVector::new(1.0, 0.1, 0.003, 2.86, 0.005),
                loss: 0.0,
                converged: true,
            },
        ];
        let maps = ParameterMaps::from_pixel_fits(2, 1, &fits).unwrap();
        let shift = frequency_shift_map(&maps, NV_ZERO_FIELD_GHZ);

        assert_eq!(shift.shape(), (2, 1));
        assert!((shift[(0, 0)] - 0.005).abs() < 1e-12);
        assert!((shift[(1, 0)] + 0.01).abs() < 1e-12);
    }

    #[test]
    fn map_stats_skip_non_finite_and_masked() {
        let map = DMatrix::from_row_slice(2, 2, &[1.0, 3.0, f64::NAN, 5.0]);
        let stats = MapStats::of(&map).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!((stats.min, stats.max, stats.mean), (1.0, 5.0, 3.0));

        let mask = DMatrix::from_row_slice(2, 2, &[false, true, true, true]);
        let masked = MapStats::of_masked(&map, &mask).unwrap();
        assert_eq!(masked.count, 2);
        assert_eq!(masked.mean, 4.0);
        assert_eq!(masked.std, 1.0);

        let none = DMatrix::from_element(1, 1, false);
        assert!(MapStats::of_masked(&DMatrix::from_element(1, 1, 1.0), &none).is_none());
    }
}
