//! Unit conversion
//!
//! Mapping between degrees, microseconds and transport units.

pub mod converter;

pub use converter::{micros_to_units, units_to_micros, Calibration, UnitConverter};
