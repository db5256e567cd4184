//! PCA9685 16 channel PWM expander
//!
//! The expander runs at a 20 ms period split into 4096 steps, so one
//! unit is about 4.88 us and the default servo range is 111..491 units.
//! Each channel's pulse starts at a staggered ON offset to spread the
//! rising edges (and the current draw) over the period.
//!
//! # Usage
//!
//! ```ignore
//! let mut expander = Pca9685::new(i2c, pca9685::DEFAULT_ADDRESS);
//! expander.reset()?;
//! expander.init(&mut delay)?;
//! let controller = EasingController::new(expander, ticks, clock, config);
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use glide_core::config::{DEFAULT_EXPANDER_UNITS_FOR_180_DEGREE, MAX_EXPANDER_SERVOS};
use glide_core::traits::{Transport, TransportError, UnitSpace, EXPANDER_STEPS_PER_PERIOD};

/// I2C address with all address pins low
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// General call address, reaches every expander on the bus
pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Software reset command sent to the general call address
pub const SOFTWARE_RESET: u8 = 0x06;

/// Prescaler for a 20 ms period with the internal 25 MHz oscillator
pub const PRESCALER_FOR_20_MS: u8 = 0x79;

/// ON offset between neighboring channels
///
/// Chosen so that channel 15 plus the longest pulse (180 degree plus
/// some margin) still ends inside the period.
pub const STAGGER_UNITS: u16 =
    ((EXPANDER_STEPS_PER_PERIOD - (DEFAULT_EXPANDER_UNITS_FOR_180_DEGREE + 100)) / 15) as u16;

/// OFF value with the "fully off" bit set
const FULL_OFF: u16 = 0x1000;

/// Counter mask of the ON/OFF registers
const COUNTER_MASK: u16 = 0x0FFF;

mod reg {
    pub const MODE1: u8 = 0x00;
    pub const LED0_ON_L: u8 = 0x06;
    pub const PRESCALE: u8 = 0xFE;
}

mod mode1 {
    pub const SLEEP: u8 = 1 << 4;
    pub const AUTO_INCREMENT: u8 = 1 << 5;
}

/// Map an I2C error to a transport error
fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> TransportError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => TransportError::Nack,
        _ => TransportError::Bus,
    }
}

/// PCA9685 expander driving up to 16 servos
pub struct Pca9685<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Pca9685<I> {
    /// Create a driver for the expander at `address`
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// I2C address of this expander
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Software reset of every expander on the bus
    pub fn reset(&mut self) -> Result<(), TransportError> {
        self.i2c
            .write(GENERAL_CALL_ADDRESS, &[SOFTWARE_RESET])
            .map_err(bus_error)
    }

    /// Set the 20 ms period and enable register auto increment
    ///
    /// The prescaler can only be written while sleeping; the oscillator
    /// needs 500 us to restart after waking up.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), TransportError> {
        self.write_register(reg::MODE1, mode1::SLEEP)?;
        self.write_register(reg::PRESCALE, PRESCALER_FOR_20_MS)?;
        self.write_register(reg::MODE1, mode1::AUTO_INCREMENT)?;
        delay.delay_ms(2);
        Ok(())
    }

    /// Probe the expander; true if it acknowledges a register read
    pub fn check_connection(&mut self) -> bool {
        let mut mode = [0u8];
        let ok = self
            .i2c
            .write_read(self.address, &[reg::MODE1], &mut mode)
            .is_ok();
        if !ok {
            #[cfg(feature = "defmt")]
            defmt::warn!("No PCA9685 at address {=u8:#x}", self.address);
        }
        ok
    }

    /// Write ON and OFF counter values of a channel
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), TransportError> {
        if channel as usize >= MAX_EXPANDER_SERVOS {
            return Err(TransportError::InvalidChannel);
        }
        let register = reg::LED0_ON_L + 4 * channel;
        let [on_l, on_h] = on.to_le_bytes();
        let [off_l, off_h] = off.to_le_bytes();
        self.i2c
            .write(self.address, &[register, on_l, on_h, off_l, off_h])
            .map_err(bus_error)
    }

    /// Write only the OFF counter of a channel, leaving ON untouched
    pub fn set_off(&mut self, channel: u8, off: u16) -> Result<(), TransportError> {
        if channel as usize >= MAX_EXPANDER_SERVOS {
            return Err(TransportError::InvalidChannel);
        }
        let register = reg::LED0_ON_L + 2 + 4 * channel;
        let [off_l, off_h] = off.to_le_bytes();
        self.i2c
            .write(self.address, &[register, off_l, off_h])
            .map_err(bus_error)
    }

    /// Release the I2C bus
    pub fn free(self) -> I {
        self.i2c
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(bus_error)
    }
}

impl<I: I2c> Transport for Pca9685<I> {
    fn unit_space(&self) -> UnitSpace {
        UnitSpace::expander()
    }

    fn init_channel(&mut self, channel: u8) -> Result<(), TransportError> {
        if channel as usize >= MAX_EXPANDER_SERVOS {
            return Err(TransportError::InvalidChannel);
        }
        Ok(())
    }

    fn write_raw(&mut self, channel: u8, units: i32) -> Result<(), TransportError> {
        let on = channel as u16 * STAGGER_UNITS;
        let width = units.clamp(0, COUNTER_MASK as i32) as u16;
        // The pulse may wrap around the end of the period
        let off = (on + width) & COUNTER_MASK;
        self.set_pwm(channel, on & COUNTER_MASK, off)
    }

    fn release(&mut self, channel: u8) -> Result<(), TransportError> {
        self.set_pwm(channel, 0, FULL_OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, NoAcknowledgeSource, Operation};
    use heapless::Vec;

    #[derive(Debug, PartialEq)]
    struct Write {
        address: u8,
        bytes: Vec<u8, 8>,
    }

    struct MockI2c {
        writes: Vec<Write, 32>,
        nack: bool,
    }

    impl MockI2c {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                nack: false,
            }
        }

        fn last(&self) -> &[u8] {
            self.writes.last().map(|w| w.bytes.as_slice()).unwrap_or(&[])
        }
    }

    impl ErrorType for MockI2c {
        type Error = ErrorKind;
    }

    impl I2c for MockI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.nack {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        let _ = self.writes.push(Write {
                            address,
                            bytes: Vec::from_slice(bytes).unwrap_or_default(),
                        });
                    }
                    Operation::Read(buf) => buf.fill(0x11),
                }
            }
            Ok(())
        }
    }

    struct MockDelay {
        ms: u32,
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ms += ns / 1_000_000;
        }
    }

    #[test]
    fn test_stagger_offset() {
        assert_eq!(STAGGER_UNITS, 233);
    }

    #[test]
    fn test_reset_uses_general_call() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        pca.reset().unwrap();
        let i2c = pca.free();
        assert_eq!(i2c.writes[0].address, GENERAL_CALL_ADDRESS);
        assert_eq!(i2c.writes[0].bytes.as_slice(), &[SOFTWARE_RESET]);
    }

    #[test]
    fn test_init_sequence() {
        let mut pca = Pca9685::new(MockI2c::new(), 0x41);
        let mut delay = MockDelay { ms: 0 };
        pca.init(&mut delay).unwrap();
        assert!(delay.ms >= 2);

        let i2c = pca.free();
        let bytes: Vec<&[u8], 3> = i2c.writes.iter().map(|w| w.bytes.as_slice()).collect();
        assert_eq!(
            bytes.as_slice(),
            &[&[0x00, 0x10][..], &[0xFE, 0x79][..], &[0x00, 0x20][..]]
        );
        assert!(i2c.writes.iter().all(|w| w.address == 0x41));
    }

    #[test]
    fn test_write_raw_staggers_channels() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);

        pca.write_raw(0, 307).unwrap();
        assert_eq!(pca.i2c.last(), &[0x06, 0, 0, 0x33, 0x01]);

        // Channel 2: ON = 466, OFF = 466 + 111 = 577
        pca.write_raw(2, 111).unwrap();
        assert_eq!(pca.i2c.last(), &[0x0E, 0xD2, 0x01, 0x41, 0x02]);
    }

    #[test]
    fn test_last_channel_fits_period() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        pca.write_raw(15, 491).unwrap();
        let bytes = pca.i2c.last();
        let off = u16::from_le_bytes([bytes[3], bytes[4]]);
        assert_eq!(bytes[0], 0x06 + 60);
        assert_eq!(off, 15 * 233 + 491);
        assert!(off < 4096);
    }

    #[test]
    fn test_set_off_only() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        pca.set_off(1, 300).unwrap();
        assert_eq!(pca.i2c.last(), &[0x0C, 0x2C, 0x01]);
    }

    #[test]
    fn test_release_fully_off() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        pca.release(3).unwrap();
        assert_eq!(pca.i2c.last(), &[0x12, 0, 0, 0x00, 0x10]);
    }

    #[test]
    fn test_invalid_channel() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        assert_eq!(pca.write_raw(16, 300), Err(TransportError::InvalidChannel));
        assert_eq!(pca.init_channel(16), Err(TransportError::InvalidChannel));
        assert!(pca.init_channel(15).is_ok());
        assert!(pca.i2c.writes.is_empty());
    }

    #[test]
    fn test_nack_maps_to_transport_error() {
        let mut i2c = MockI2c::new();
        i2c.nack = true;
        let mut pca = Pca9685::new(i2c, DEFAULT_ADDRESS);
        assert_eq!(pca.write_raw(0, 300), Err(TransportError::Nack));
        assert!(!pca.check_connection());
    }

    #[test]
    fn test_check_connection() {
        let mut pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        assert!(pca.check_connection());
    }

    #[test]
    fn test_unit_space() {
        let pca = Pca9685::new(MockI2c::new(), DEFAULT_ADDRESS);
        assert_eq!(pca.unit_space(), UnitSpace::expander());
        assert_eq!(pca.address(), DEFAULT_ADDRESS);
    }
}
