//! Per-servo motion
//!
//! Trajectory planning and time based stepping for a single servo.

pub mod servo;

pub use servo::{MotionSnapshot, Servo, TargetReachedHandler};
