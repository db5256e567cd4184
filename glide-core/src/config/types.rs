//! Configuration type definitions
//!
//! Build-time and attach-time settings of the easing engine. None of these
//! change while servos are moving.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Servo refresh period in microseconds (50 Hz)
pub const REFRESH_INTERVAL_US: u32 = 20_000;

/// Servo refresh period in milliseconds
pub const REFRESH_INTERVAL_MS: u32 = REFRESH_INTERVAL_US / 1000;

/// Values below this are degrees, values at or above are microseconds
pub const MICROS_THRESHOLD: i32 = 400;

/// Default servo slots when driving pins directly
pub const DEFAULT_MAX_SERVOS: usize = 12;

/// Servo slots when every channel of one PCA9685 is in use
pub const MAX_EXPANDER_SERVOS: usize = 16;

/// Speed used by `ease_to` until `set_speed` is called
pub const DEFAULT_SPEED_DPS: u16 = 5;

/// Pulse width for 0 degree of a typical hobby servo
pub const DEFAULT_MICROSECONDS_FOR_0_DEGREE: i32 = 544;

/// Pulse width for 180 degree of a typical hobby servo
pub const DEFAULT_MICROSECONDS_FOR_180_DEGREE: i32 = 2400;

/// Neutral pulse width written before the first explicit write
pub const DEFAULT_PULSE_WIDTH_US: i32 = 1500;

/// PCA9685 units for 0 degree (544 us at 20 ms / 4096)
pub const DEFAULT_EXPANDER_UNITS_FOR_0_DEGREE: i32 = 111;

/// PCA9685 units for 90 degree
pub const DEFAULT_EXPANDER_UNITS_FOR_90_DEGREE: i32 = 301;

/// PCA9685 units for 180 degree (2400 us at 20 ms / 4096)
pub const DEFAULT_EXPANDER_UNITS_FOR_180_DEGREE: i32 = 491;

/// Easing engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EasingConfig {
    /// Tick period of the shared update timer in microseconds
    pub refresh_interval_us: u32,
    /// Degree/microsecond disambiguation threshold
    pub micros_threshold: i32,
    /// Accept microsecond values wherever a degree is expected
    pub micros_as_degree: bool,
    /// Enable the nonlinear curve set (otherwise every move is linear)
    pub nonlinear_curves: bool,
    /// Write every computed position, even unchanged ones (plotter output)
    pub stream_every_step: bool,
    /// Initial per-servo speed in degrees per second
    pub default_speed_dps: u16,
}

impl Default for EasingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_us: REFRESH_INTERVAL_US,
            micros_threshold: MICROS_THRESHOLD,
            micros_as_degree: true,
            nonlinear_curves: true,
            stream_every_step: false,
            default_speed_dps: DEFAULT_SPEED_DPS,
        }
    }
}

impl EasingConfig {
    /// Configuration for builds that only need linear movement
    pub const fn linear_only() -> Self {
        Self {
            refresh_interval_us: REFRESH_INTERVAL_US,
            micros_threshold: MICROS_THRESHOLD,
            micros_as_degree: true,
            nonlinear_curves: false,
            stream_every_step: false,
            default_speed_dps: DEFAULT_SPEED_DPS,
        }
    }

    /// Refresh interval in whole milliseconds (at least 1)
    pub fn refresh_interval_ms(&self) -> u32 {
        (self.refresh_interval_us / 1000).max(1)
    }
}
