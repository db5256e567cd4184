//! Configuration types
//!
//! Engine settings and servo calibration records.

pub mod calibration;
pub mod types;

pub use calibration::*;
pub use types::*;
