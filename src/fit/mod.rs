//! Per-pixel fitting stages.
//!
//! Responsibilities:
//!
//! - segment each trace into dip intervals (`segment`)
//! - turn segments into an initial parameter guess (`guess`)
//! - refine a batch of guesses with Adam in log space (`optimizer`)
//! - accept or reject refined fits (`gate`)
//! - run all of the above for one trace with intermediates kept (`inspect`)

pub mod gate;
pub mod guess;
pub mod inspect;
pub mod optimizer;
pub mod segment;

pub use gate::*;
pub use guess::*;
pub use inspect::*;
pub use optimizer::*;
pub use segment::*;
