//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the input cube and frequency axis (`SpectralCube`, `FrequencyAxis`)
//! - fit configuration (`FitConfig` and its enums)
//! - per-pixel and per-grid outputs (`ParamVector`, `PixelFit`, `ParameterMaps`)

pub mod config;
pub mod cube;
pub mod types;

pub use config::*;
pub use cube::*;
pub use types::*;
