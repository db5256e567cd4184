//! Servo pulse transports
//!
//! This crate provides concrete implementations of the
//! [`Transport`](glide_core::traits::Transport) trait defined in glide-core:
//!
//! - Direct PWM outputs (`embedded_hal::pwm::SetDutyCycle`)
//! - PCA9685 16 channel I2C expander (`embedded_hal::i2c::I2c`)

#![no_std]
#![deny(unsafe_code)]

pub mod servo;
