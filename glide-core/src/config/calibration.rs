//! Servo end-position calibration record
//!
//! Measured pulse widths, trim and direction of one servo, applied in one
//! go by [`EasingController::attach_calibrated`](crate::registry::EasingController::attach_calibrated).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::{DEFAULT_MICROSECONDS_FOR_0_DEGREE, DEFAULT_MICROSECONDS_FOR_180_DEGREE};

/// Calibration of a single servo channel
///
/// Pulse widths are always microseconds here, independent of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServoCalibration {
    /// Output channel (pin slot or expander channel)
    pub channel: u8,
    /// Pulse width at `degree_low`
    pub micros_low: i16,
    /// Pulse width at `degree_high`
    pub micros_high: i16,
    /// Logical angle for `micros_low` (may be negative)
    pub degree_low: i16,
    /// Logical angle for `micros_high`
    pub degree_high: i16,
    /// Trim offset in microseconds
    pub trim_micros: i16,
    /// Operate the servo reversed
    pub reverse: bool,
}

impl ServoCalibration {
    /// Typical hobby servo on `channel`: 544 us at 0 and 2400 us at 180 degree
    pub const fn typical(channel: u8) -> Self {
        Self::new(
            channel,
            DEFAULT_MICROSECONDS_FOR_0_DEGREE as i16,
            DEFAULT_MICROSECONDS_FOR_180_DEGREE as i16,
        )
    }

    /// Create a calibration for the logical 0..180 degree range
    pub const fn new(channel: u8, micros_low: i16, micros_high: i16) -> Self {
        Self::with_range(channel, micros_low, micros_high, 0, 180)
    }

    /// Create a calibration for a custom logical range, e.g. -90..90
    pub const fn with_range(
        channel: u8,
        micros_low: i16,
        micros_high: i16,
        degree_low: i16,
        degree_high: i16,
    ) -> Self {
        Self {
            channel,
            micros_low,
            micros_high,
            degree_low,
            degree_high,
            trim_micros: 0,
            reverse: false,
        }
    }

    pub const fn with_trim_micros(mut self, trim_micros: i16) -> Self {
        self.trim_micros = trim_micros;
        self
    }

    pub const fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_calibration() {
        let cal = ServoCalibration::typical(4);
        assert_eq!(cal.channel, 4);
        assert_eq!((cal.micros_low, cal.micros_high), (544, 2400));
        assert_eq!((cal.degree_low, cal.degree_high), (0, 180));
        assert_eq!(cal.trim_micros, 0);
        assert!(!cal.reverse);
    }

    #[test]
    fn test_builder_keeps_range() {
        let cal = ServoCalibration::with_range(1, 1000, 2000, -90, 90)
            .with_trim_micros(-15)
            .reversed(true);
        assert_eq!((cal.degree_low, cal.degree_high), (-90, 90));
        assert_eq!(cal.trim_micros, -15);
        assert!(cal.reverse);
    }
}
