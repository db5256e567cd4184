//! Servo registry and multi-servo orchestration

pub mod controller;
pub mod slots;

pub use controller::EasingController;
pub use slots::{AttachError, ServoId, ServoRegistry};
