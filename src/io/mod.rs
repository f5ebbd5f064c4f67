//! Input/output helpers.
//!
//! - fit config JSON read + validation (`config`)
//! - JSON rendering of outputs for the CLI (`config::to_json_pretty`)

pub mod config;

pub use config::*;
