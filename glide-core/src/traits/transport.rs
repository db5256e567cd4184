//! Pulse output transport trait
//!
//! A transport turns a final (calibrated, trimmed, reversed) unit value into
//! a servo pulse on one channel. Implementations exist for direct PWM pins
//! and for the PCA9685 I2C expander.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::REFRESH_INTERVAL_US;

/// Number of PCA9685 steps in one PWM period
pub const EXPANDER_STEPS_PER_PERIOD: i32 = 4096;

/// Internal unit space used by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnitSpace {
    /// Units are pulse widths in microseconds
    #[default]
    Microseconds,
    /// Units are 1/4096 of the expander's PWM period
    Expander {
        /// PWM period of the expander in microseconds
        refresh_interval_us: u32,
    },
}

impl UnitSpace {
    /// Expander unit space with the standard 20 ms period
    pub const fn expander() -> Self {
        Self::Expander {
            refresh_interval_us: REFRESH_INTERVAL_US,
        }
    }

    /// Check if this unit space belongs to an expander
    pub const fn is_expander(&self) -> bool {
        matches!(self, Self::Expander { .. })
    }
}

/// Errors reported by a transport write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The device did not acknowledge (I2C NACK)
    Nack,
    /// Any other bus or peripheral failure
    Bus,
    /// No output exists for this channel
    InvalidChannel,
}

/// Servo pulse output
///
/// The motion core calls this at most once per servo per tick. Failures
/// are diagnosed by the caller and never retried.
pub trait Transport {
    /// Unit space in which `write_raw` values are expressed
    fn unit_space(&self) -> UnitSpace;

    /// Prepare a channel for output (called once at attach time)
    fn init_channel(&mut self, _channel: u8) -> Result<(), TransportError> {
        Ok(())
    }

    /// Write a final unit value to a channel
    fn write_raw(&mut self, channel: u8, units: i32) -> Result<(), TransportError>;

    /// Turn the channel output fully off (called at detach)
    fn release(&mut self, channel: u8) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn unit_space(&self) -> UnitSpace {
        (**self).unit_space()
    }

    fn init_channel(&mut self, channel: u8) -> Result<(), TransportError> {
        (**self).init_channel(channel)
    }

    fn write_raw(&mut self, channel: u8, units: i32) -> Result<(), TransportError> {
        (**self).write_raw(channel, units)
    }

    fn release(&mut self, channel: u8) -> Result<(), TransportError> {
        (**self).release(channel)
    }
}
