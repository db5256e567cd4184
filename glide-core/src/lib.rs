//! Board-agnostic servo easing engine
//!
//! This crate contains everything that does not depend on a specific
//! board or pulse output:
//!
//! - Hardware abstraction traits (pulse transport, tick source, clock)
//! - Degree / microsecond / unit conversion
//! - Easing curves and easing type encoding
//! - Per-servo motion state machine
//! - Servo registry and multi-servo orchestration
//! - Configuration and calibration types

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod easing;
pub mod motion;
pub mod registry;
pub mod traits;
pub mod units;
