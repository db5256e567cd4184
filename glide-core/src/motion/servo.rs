//! Per-servo motion state machine
//!
//! A [`Servo`] owns one trajectory (start, end, delta, duration, easing) and
//! advances it with [`Servo::step`]. Time is passed in as a millisecond
//! tick count, output goes through a [`Transport`]. Trim and reverse are
//! applied only on the way out, never during trajectory math.

use crate::config::{
    EasingConfig, DEFAULT_EXPANDER_UNITS_FOR_90_DEGREE, DEFAULT_PULSE_WIDTH_US,
};
use crate::easing::{
    CallStyle, Curve, EaseFn, EasingType, EASE_FUNCTION_DEGREE_INDICATOR_OFFSET,
    EASE_FUNCTION_DEGREE_THRESHOLD,
};
use crate::traits::{Transport, UnitSpace};
use crate::units::UnitConverter;

/// Called from [`Servo::step`] once the end position is written
///
/// The servo is already idle when the handler runs, so it may arm the
/// next move right away. The second argument is the tick of completion.
pub type TargetReachedHandler = fn(&mut Servo, u32);

/// Diagnostic view of a servo's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSnapshot {
    pub channel: u8,
    pub moving: bool,
    pub current_units: i32,
    pub current_degree: i32,
    pub end_units: i32,
    pub end_degree: i32,
    pub delta_units: i32,
    pub delta_degree: i32,
    pub speed_dps: u16,
    pub duration_ms: u32,
    pub easing_code: u8,
    pub trim_units: i32,
    pub reverse: bool,
    pub unit0: i32,
    pub unit180: i32,
}

/// Motion state of one servo
#[derive(Debug, Clone)]
pub struct Servo {
    channel: u8,
    converter: UnitConverter,
    trim_units: i32,
    reverse: bool,

    current_units: i32,
    start_units: i32,
    end_units: i32,
    delta_units: i32,
    duration_ms: u32,
    start_ms: u32,
    moving: bool,

    speed_dps: u16,
    easing: EasingType,
    user_ease: Option<EaseFn>,
    on_target_reached: Option<TargetReachedHandler>,

    nonlinear_curves: bool,
    stream_every_step: bool,
}

impl Servo {
    /// Create an idle servo resting at the neutral position
    ///
    /// Nothing is written until the first `write` or move.
    pub fn new(channel: u8, converter: UnitConverter, config: &EasingConfig) -> Self {
        let neutral = match converter.unit_space() {
            UnitSpace::Microseconds => DEFAULT_PULSE_WIDTH_US,
            UnitSpace::Expander { .. } => DEFAULT_EXPANDER_UNITS_FOR_90_DEGREE,
        };
        Self {
            channel,
            converter,
            trim_units: 0,
            reverse: false,
            current_units: neutral,
            start_units: neutral,
            end_units: neutral,
            delta_units: 0,
            duration_ms: 0,
            start_ms: 0,
            moving: false,
            speed_dps: config.default_speed_dps,
            easing: EasingType::LINEAR,
            user_ease: None,
            on_target_reached: None,
            nonlinear_curves: config.nonlinear_curves,
            stream_every_step: config.stream_every_step,
        }
    }

    /// Output channel on the transport
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Converter holding this servo's calibration
    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    // -- Output path --

    /// Move immediately to a degree or microsecond value
    pub fn write<T: Transport + ?Sized>(&mut self, transport: &mut T, value: i32) {
        let units = self.converter.degree_or_micros_to_units(value);
        self.write_units(transport, units);
    }

    /// Move immediately to a unit value
    ///
    /// This is the only place where `current_units` changes.
    pub fn write_units<T: Transport + ?Sized>(&mut self, transport: &mut T, units: i32) {
        self.current_units = units;
        let output = self.output_units(units);
        if let Err(_e) = transport.write_raw(self.channel, output) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Servo channel {} write of {} failed: {}", self.channel, output, _e);
        }
    }

    /// Write the current position again, e.g. after changing trim
    pub fn refresh<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        self.write_units(transport, self.current_units);
    }

    /// Unit value sent to the transport for a logical unit value
    fn output_units(&self, units: i32) -> i32 {
        let trimmed = units + self.trim_units;
        if self.reverse {
            self.converter.calibration().reverse(trimmed)
        } else {
            trimmed
        }
    }

    /// Unit value a `write(degree)` would send to the transport
    pub fn degree_to_units_with_trim_and_reverse(&self, degree: i32) -> i32 {
        self.output_units(self.converter.degree_to_units(degree))
    }

    // -- Settings --

    /// Mirror all output around the calibration midpoint
    pub fn set_reverse_operation(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Set the trim as a signed degree offset
    pub fn set_trim(&mut self, degree: i32) {
        self.trim_units = self.converter.degree_to_unit_offset(degree);
    }

    /// Set the trim as a signed unit offset
    pub fn set_trim_units(&mut self, units: i32) {
        self.trim_units = units;
    }

    pub fn trim_units(&self) -> i32 {
        self.trim_units
    }

    /// Default speed for speed based moves, in degree per second
    pub fn set_speed(&mut self, degrees_per_second: u16) {
        self.speed_dps = degrees_per_second;
    }

    pub fn speed(&self) -> u16 {
        self.speed_dps
    }

    pub fn set_easing_type(&mut self, easing: EasingType) {
        self.easing = easing;
    }

    pub fn easing_type(&self) -> EasingType {
        self.easing
    }

    /// Curve used by [`Curve::User`] easing types
    pub fn register_user_ease_in_function(&mut self, f: EaseFn) {
        self.user_ease = Some(f);
    }

    pub fn set_target_reached_handler(&mut self, handler: Option<TargetReachedHandler>) {
        self.on_target_reached = handler;
    }

    /// Easing type actually applied by `step`
    fn effective_easing(&self) -> EasingType {
        if self.nonlinear_curves {
            self.easing
        } else {
            EasingType::LINEAR
        }
    }

    /// Check if a new target is ignored and the position held instead
    pub fn holds_position(&self) -> bool {
        self.effective_easing().curve == Curve::Dummy
    }

    fn is_bouncing(&self) -> bool {
        self.effective_easing().style == CallStyle::BouncingOutIn
    }

    // -- Arming --

    /// Plan a move to a degree or microsecond value taking `millis`
    ///
    /// Does not step. Returns true if a previous move was still in
    /// progress and got replaced.
    pub fn set_target_and_duration(&mut self, value: i32, millis: u32, now_ms: u32) -> bool {
        if !self.holds_position() {
            self.end_units = self.converter.degree_or_micros_to_units(value);
        } else {
            self.end_units = self.current_units;
        }
        self.arm(millis, now_ms)
    }

    /// Plan a move to a degree or microsecond value at a speed
    ///
    /// A speed of zero is treated as 1 degree per second. Bouncing moves
    /// travel the distance twice and get twice the time.
    pub fn set_target_and_speed(&mut self, value: i32, degrees_per_second: u16, now_ms: u32) -> bool {
        let millis = self.millis_for_speed(value, degrees_per_second);
        self.set_target_and_duration(value, millis, now_ms)
    }

    /// Duration of a speed based move from the current position
    pub fn millis_for_speed(&self, value: i32, degrees_per_second: u16) -> u32 {
        let speed = if degrees_per_second == 0 {
            #[cfg(feature = "defmt")]
            defmt::debug!("Servo channel {}: speed 0 set to 1", self.channel);
            1
        } else {
            degrees_per_second
        };

        let target_degree = if self.converter.is_micros(value) {
            self.converter.micros_to_degree(value)
        } else {
            value
        };
        let current_degree = self.converter.units_to_degree(self.current_units);

        let millis = target_degree.abs_diff(current_degree) as u64 * 1000 / speed as u64;
        let millis = u32::try_from(millis).unwrap_or(u32::MAX);
        if self.is_bouncing() {
            millis.saturating_mul(2)
        } else {
            millis
        }
    }

    /// Hold the current position for `millis`, then complete as usual
    ///
    /// Useful as a delay inside a chain of target reached handlers.
    pub fn no_movement(&mut self, millis: u32, now_ms: u32) -> bool {
        self.end_units = self.current_units;
        self.arm(millis, now_ms)
    }

    fn arm(&mut self, millis: u32, now_ms: u32) -> bool {
        let current = self.current_units;
        self.delta_units = self.end_units - current;
        self.duration_ms = millis;
        self.start_units = current;
        if self.is_bouncing() {
            self.end_units = current;
        }
        self.start_ms = now_ms;

        let interrupted = self.moving;
        self.moving = true;
        interrupted
    }

    /// Overwrite duration and start tick of an armed move
    pub(crate) fn synchronize(&mut self, duration_ms: u32, start_ms: u32) {
        self.duration_ms = duration_ms;
        self.start_ms = start_ms;
    }

    // -- Stepping --

    /// Advance the trajectory to `now_ms`
    ///
    /// Returns true once the servo is idle, including when it was idle
    /// before the call.
    pub fn step<T: Transport + ?Sized>(&mut self, transport: &mut T, now_ms: u32) -> bool {
        if !self.moving {
            if self.stream_every_step {
                self.refresh(transport);
            }
            return true;
        }

        let elapsed = now_ms.wrapping_sub(self.start_ms);
        if elapsed >= self.duration_ms {
            self.write_units(transport, self.end_units);
            self.moving = false;
            if let Some(handler) = self.on_target_reached {
                handler(self, now_ms);
            }
            // The handler may have armed the next move
            return !self.moving;
        }

        let easing = self.effective_easing();
        let next = if easing.is_linear() {
            self.start_units
                + (self.delta_units as i64 * elapsed as i64 / self.duration_ms as i64) as i32
        } else {
            let t = elapsed as f32 / self.duration_ms as f32;
            let completion = easing.movement_completion(t, self.user_ease);
            if completion >= EASE_FUNCTION_DEGREE_THRESHOLD {
                let degree = (completion - EASE_FUNCTION_DEGREE_INDICATOR_OFFSET + 0.5) as i32;
                self.converter.degree_or_micros_to_units(degree)
            } else {
                self.start_units + (self.delta_units as f32 * completion) as i32
            }
        };

        if self.stream_every_step || next != self.current_units {
            self.write_units(transport, next);
        }
        false
    }

    /// Freeze at the current position
    pub fn stop(&mut self) {
        self.moving = false;
    }

    /// Resume a stopped move with its planned parameters
    pub fn resume(&mut self) {
        self.moving = true;
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    // -- Queries --

    pub fn current_units(&self) -> i32 {
        self.current_units
    }

    pub fn current_angle(&self) -> i32 {
        self.converter.units_to_degree(self.current_units)
    }

    pub fn start_units(&self) -> i32 {
        self.start_units
    }

    pub fn end_units(&self) -> i32 {
        self.end_units
    }

    /// End position as sent to the transport before reversing
    pub fn end_units_with_trim(&self) -> i32 {
        self.end_units + self.trim_units
    }

    pub fn delta_units(&self) -> i32 {
        self.delta_units
    }

    pub fn millis_for_complete_move(&self) -> u32 {
        self.duration_ms
    }

    /// Tick at which the current move started
    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        let calibration = self.converter.calibration();
        MotionSnapshot {
            channel: self.channel,
            moving: self.moving,
            current_units: self.current_units,
            current_degree: self.current_angle(),
            end_units: self.end_units,
            end_degree: self.converter.units_to_degree(self.end_units),
            delta_units: self.delta_units,
            delta_degree: self.converter.unit_offset_to_degree(self.delta_units),
            speed_dps: self.speed_dps,
            duration_ms: self.duration_ms,
            easing_code: self.easing.code(),
            trim_units: self.trim_units,
            reverse: self.reverse,
            unit0: calibration.unit0(),
            unit180: calibration.unit180(),
        }
    }
}
