//! Input data sources.

pub mod synthetic;

pub use synthetic::*;
