//! Mathematical utilities: descriptive statistics and the Adam update rule.

pub mod adam;
pub mod stats;

pub use adam::*;
pub use stats::*;
