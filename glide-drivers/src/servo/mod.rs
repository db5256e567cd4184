//! Servo output transports

pub mod pca9685;
pub mod pwm;

pub use pca9685::Pca9685;
pub use pwm::PwmTransport;
