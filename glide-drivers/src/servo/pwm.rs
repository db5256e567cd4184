//! Servo pulses from PWM pins
//!
//! Each channel is one `SetDutyCycle` output running at the servo refresh
//! period. Units are pulse widths in microseconds; the duty cycle is the
//! pulse width as a fraction of the period.

use embedded_hal::pwm::SetDutyCycle;
use glide_core::config::REFRESH_INTERVAL_US;
use glide_core::traits::{Transport, TransportError, UnitSpace};
use heapless::Vec;

/// Transport over up to `N` PWM outputs
///
/// Channel numbers are the order in which outputs were added.
pub struct PwmTransport<P, const N: usize> {
    outputs: Vec<P, N>,
    period_us: u16,
}

impl<P: SetDutyCycle, const N: usize> Default for PwmTransport<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SetDutyCycle, const N: usize> PwmTransport<P, N> {
    /// Create a transport for outputs configured to the 20 ms period
    pub fn new() -> Self {
        Self::with_period(REFRESH_INTERVAL_US as u16)
    }

    /// Create a transport for outputs running at `period_us`
    pub fn with_period(period_us: u16) -> Self {
        Self {
            outputs: Vec::new(),
            period_us: period_us.max(1),
        }
    }

    /// Add an output and return its channel number
    ///
    /// Returns the output back if every channel is taken.
    pub fn add_output(&mut self, output: P) -> Result<u8, P> {
        let channel = self.outputs.len() as u8;
        self.outputs.push(output)?;
        Ok(channel)
    }

    /// Number of outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    fn output(&mut self, channel: u8) -> Result<&mut P, TransportError> {
        self.outputs
            .get_mut(channel as usize)
            .ok_or(TransportError::InvalidChannel)
    }
}

impl<P: SetDutyCycle, const N: usize> Transport for PwmTransport<P, N> {
    fn unit_space(&self) -> UnitSpace {
        UnitSpace::Microseconds
    }

    fn init_channel(&mut self, channel: u8) -> Result<(), TransportError> {
        self.output(channel).map(|_| ())
    }

    fn write_raw(&mut self, channel: u8, units: i32) -> Result<(), TransportError> {
        let period = self.period_us;
        let pulse = units.clamp(0, period as i32) as u16;
        self.output(channel)?
            .set_duty_cycle_fraction(pulse, period)
            .map_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("PWM write failed on channel {}", channel);
                TransportError::Bus
            })
    }

    fn release(&mut self, channel: u8) -> Result<(), TransportError> {
        self.output(channel)?
            .set_duty_cycle_fully_off()
            .map_err(|_e| TransportError::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    struct MockPwm {
        max_duty: u16,
        duty: u16,
    }

    impl MockPwm {
        fn new() -> Self {
            Self {
                max_duty: 20_000,
                duty: 0,
            }
        }
    }

    impl ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max_duty
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_add_output_assigns_channels() {
        let mut pwm: PwmTransport<MockPwm, 2> = PwmTransport::new();
        assert_eq!(pwm.add_output(MockPwm::new()).ok(), Some(0));
        assert_eq!(pwm.add_output(MockPwm::new()).ok(), Some(1));
        assert!(pwm.add_output(MockPwm::new()).is_err());
        assert_eq!(pwm.len(), 2);
    }

    #[test]
    fn test_write_pulse_width() {
        let mut pwm: PwmTransport<MockPwm, 1> = PwmTransport::new();
        pwm.add_output(MockPwm::new()).ok();

        pwm.write_raw(0, 1500).unwrap();
        assert_eq!(pwm.outputs[0].duty, 1500);
    }

    #[test]
    fn test_duty_scales_to_resolution() {
        let mut pwm: PwmTransport<MockPwm, 1> = PwmTransport::new();
        pwm.add_output(MockPwm {
            max_duty: 40_000,
            duty: 0,
        })
        .ok();

        pwm.write_raw(0, 544).unwrap();
        assert_eq!(pwm.outputs[0].duty, 1088);
    }

    #[test]
    fn test_write_clamps_to_period() {
        let mut pwm: PwmTransport<MockPwm, 1> = PwmTransport::new();
        pwm.add_output(MockPwm::new()).ok();

        pwm.write_raw(0, 30_000).unwrap();
        assert_eq!(pwm.outputs[0].duty, 20_000);
        pwm.write_raw(0, -5).unwrap();
        assert_eq!(pwm.outputs[0].duty, 0);
    }

    #[test]
    fn test_release_turns_off() {
        let mut pwm: PwmTransport<MockPwm, 1> = PwmTransport::new();
        pwm.add_output(MockPwm::new()).ok();
        pwm.write_raw(0, 1500).unwrap();

        pwm.release(0).unwrap();
        assert_eq!(pwm.outputs[0].duty, 0);
    }

    #[test]
    fn test_unknown_channel() {
        let mut pwm: PwmTransport<MockPwm, 1> = PwmTransport::new();
        assert_eq!(pwm.init_channel(0), Err(TransportError::InvalidChannel));
        assert_eq!(pwm.write_raw(3, 1500), Err(TransportError::InvalidChannel));
        assert_eq!(pwm.unit_space(), UnitSpace::Microseconds);
    }
}
