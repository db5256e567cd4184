//! Multi-servo orchestrator
//!
//! [`EasingController`] owns the servo registry together with the output
//! transport, the tick source and the clock. It is the context object all
//! servo operations go through, so several independent controllers can
//! coexist (one per expander board, one per test).
//!
//! Two ways of driving motion are provided:
//!
//! - Non-blocking: arm moves with `start_interrupt = true`. The tick
//!   source then calls [`EasingController::handle_timer_tick`] every
//!   refresh interval and is cancelled once every servo has stopped.
//! - Blocking: the `*_wait_*` and `ease_to*` functions sleep one refresh
//!   interval at a time on a caller supplied delay and step in between.
//!
//! Both paths run the same stepping code and reach the same end positions.

use embedded_hal::delay::DelayNs;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

use super::slots::{AttachError, ServoId, ServoRegistry};
use crate::config::{
    EasingConfig, ServoCalibration, DEFAULT_MAX_SERVOS, DEFAULT_MICROSECONDS_FOR_0_DEGREE,
    DEFAULT_MICROSECONDS_FOR_180_DEGREE,
};
use crate::easing::{EaseFn, EasingType};
use crate::motion::{MotionSnapshot, Servo, TargetReachedHandler};
use crate::traits::{Clock, TickSource, Transport};
use crate::units::{Calibration, UnitConverter};

/// Servo easing controller
pub struct EasingController<T, K, C, const N: usize = DEFAULT_MAX_SERVOS> {
    registry: ServoRegistry<N>,
    transport: T,
    ticker: K,
    clock: C,
    config: EasingConfig,
    interrupts_active: bool,
}

impl<T, K, C, const N: usize> EasingController<T, K, C, N>
where
    T: Transport,
    K: TickSource,
    C: Clock,
{
    /// Create a controller with no servos attached
    pub fn new(transport: T, ticker: K, clock: C, config: EasingConfig) -> Self {
        Self {
            registry: ServoRegistry::new(),
            transport,
            ticker,
            clock,
            config,
            interrupts_active: false,
        }
    }

    pub fn config(&self) -> &EasingConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServoRegistry<N> {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn tick_source(&self) -> &K {
        &self.ticker
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // -- Attach / detach --

    /// Attach a servo with the default 544/2400 us end positions
    pub fn attach_default(&mut self, channel: u8) -> Result<ServoId, AttachError> {
        self.attach(
            channel,
            DEFAULT_MICROSECONDS_FOR_0_DEGREE,
            DEFAULT_MICROSECONDS_FOR_180_DEGREE,
            0,
            180,
        )
    }

    /// Attach a servo on `channel`
    ///
    /// `micros_low` and `micros_high` are the pulse widths at the logical
    /// angles `degree_low` and `degree_high`; the 0 and 180 degree end
    /// points are extrapolated from them. Use -90/90 for a servo that is
    /// addressed around its center.
    pub fn attach(
        &mut self,
        channel: u8,
        micros_low: i32,
        micros_high: i32,
        degree_low: i32,
        degree_high: i32,
    ) -> Result<ServoId, AttachError> {
        let space = self.transport.unit_space();
        let calibration =
            Calibration::from_micros(micros_low, micros_high, degree_low, degree_high, space)
                .ok_or(AttachError::InvalidCalibration)?;
        let converter = UnitConverter::with_config(calibration, space, &self.config);
        let servo = Servo::new(channel, converter, &self.config);

        let id = match self.registry.insert(servo) {
            Ok(id) => id,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No free servo slot for channel {}", channel);
                return Err(e);
            }
        };

        if let Err(_e) = self.transport.init_channel(channel) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Init of servo channel {} failed: {}", channel, _e);
        }
        Ok(id)
    }

    /// Attach a servo from a stored calibration record, including trim and reverse
    pub fn attach_calibrated(&mut self, record: &ServoCalibration) -> Result<ServoId, AttachError> {
        let id = self.attach(
            record.channel,
            record.micros_low as i32,
            record.micros_high as i32,
            record.degree_low as i32,
            record.degree_high as i32,
        )?;
        if let Some(servo) = self.registry.get_mut(id) {
            let trim = servo.converter().micros_to_units(record.trim_micros as i32);
            servo.set_trim_units(trim);
            servo.set_reverse_operation(record.reverse);
        }
        Ok(id)
    }

    /// Attach on `channel` and move to `initial` right away
    ///
    /// `record` supplies the pulse range, trim and direction; its own channel
    /// is ignored. The first pulse already carries the requested position, so
    /// the servo does not jump to the 0 degree default first.
    pub fn attach_with_initial(
        &mut self,
        channel: u8,
        initial: i32,
        record: &ServoCalibration,
    ) -> Result<ServoId, AttachError> {
        let id = self.attach_calibrated(&ServoCalibration { channel, ..*record })?;
        self.write(id, initial);
        Ok(id)
    }

    /// Remove a servo and turn its output fully off
    ///
    /// Detaching an empty slot or with a handle from an earlier attach does
    /// nothing.
    pub fn detach(&mut self, id: ServoId) {
        if let Some(servo) = self.registry.remove(id) {
            if let Err(_e) = self.transport.release(servo.channel()) {
                #[cfg(feature = "defmt")]
                defmt::warn!("Release of servo channel {} failed: {}", servo.channel(), _e);
            }
        }
    }

    /// Attached servo, None for an empty slot
    pub fn servo(&self, id: ServoId) -> Option<&Servo> {
        self.registry.get(id)
    }

    /// Attached servo for direct manipulation
    ///
    /// Changes made here bypass the next position entry and the timer.
    pub fn servo_mut(&mut self, id: ServoId) -> Option<&mut Servo> {
        self.registry.get_mut(id)
    }

    // -- Single servo --

    /// Move immediately, without easing
    pub fn write(&mut self, id: ServoId, value: i32) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.write(&mut self.transport, value);
            self.registry.set_next_position(id, value);
        }
    }

    pub fn set_reverse_operation(&mut self, id: ServoId, reverse: bool) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_reverse_operation(reverse);
        }
    }

    /// Set the trim in degree, optionally writing the current position again
    pub fn set_trim(&mut self, id: ServoId, degree: i32, do_write: bool) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_trim(degree);
            if do_write {
                servo.refresh(&mut self.transport);
            }
        }
    }

    /// Set the trim in units, optionally writing the current position again
    pub fn set_trim_units(&mut self, id: ServoId, units: i32, do_write: bool) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_trim_units(units);
            if do_write {
                servo.refresh(&mut self.transport);
            }
        }
    }

    pub fn set_speed(&mut self, id: ServoId, degrees_per_second: u16) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_speed(degrees_per_second);
        }
    }

    /// Stored speed, 0 for an empty slot
    pub fn get_speed(&self, id: ServoId) -> u16 {
        self.registry.get(id).map_or(0, Servo::speed)
    }

    pub fn set_easing_type(&mut self, id: ServoId, easing: EasingType) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_easing_type(easing);
        }
    }

    /// Easing type, linear for an empty slot
    pub fn get_easing_type(&self, id: ServoId) -> EasingType {
        self.registry
            .get(id)
            .map_or(EasingType::LINEAR, Servo::easing_type)
    }

    pub fn register_user_ease_in_function(&mut self, id: ServoId, f: EaseFn) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.register_user_ease_in_function(f);
        }
    }

    pub fn set_target_reached_handler(
        &mut self,
        id: ServoId,
        handler: Option<TargetReachedHandler>,
    ) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.set_target_reached_handler(handler);
        }
    }

    /// Plan a timed move without starting the timer
    ///
    /// Returns true if a move in progress was replaced, false otherwise
    /// (including for an empty slot).
    pub fn set_target_and_duration(&mut self, id: ServoId, value: i32, millis: u32) -> bool {
        let now = self.clock.now_ms();
        let Some(servo) = self.registry.get_mut(id) else {
            return false;
        };
        let track = !servo.holds_position();
        let interrupted = servo.set_target_and_duration(value, millis, now);
        if track {
            self.registry.set_next_position(id, value);
        }
        interrupted
    }

    /// Plan a move at `degrees_per_second` without starting the timer
    pub fn set_target_and_speed(&mut self, id: ServoId, value: i32, degrees_per_second: u16) -> bool {
        let Some(servo) = self.registry.get(id) else {
            return false;
        };
        let millis = servo.millis_for_speed(value, degrees_per_second);
        self.set_target_and_duration(id, value, millis)
    }

    /// Plan a move at the stored speed without starting the timer
    pub fn set_ease_to(&mut self, id: ServoId, value: i32) -> bool {
        let speed = self.get_speed(id);
        self.set_target_and_speed(id, value, speed)
    }

    /// Plan a move at `degrees_per_second`, optionally starting the timer
    pub fn start_move(
        &mut self,
        id: ServoId,
        value: i32,
        degrees_per_second: u16,
        start_interrupt: bool,
    ) -> bool {
        let interrupted = self.set_target_and_speed(id, value, degrees_per_second);
        if start_interrupt && self.registry.get(id).is_some() {
            self.enable_interrupts();
        }
        interrupted
    }

    /// Plan a timed move, optionally starting the timer
    pub fn start_move_with_duration(
        &mut self,
        id: ServoId,
        value: i32,
        millis: u32,
        start_interrupt: bool,
    ) -> bool {
        let interrupted = self.set_target_and_duration(id, value, millis);
        if start_interrupt && self.registry.get(id).is_some() {
            self.enable_interrupts();
        }
        interrupted
    }

    /// Start a move at the stored speed, driven by the timer
    pub fn start_ease_to(&mut self, id: ServoId, value: i32) -> bool {
        let speed = self.get_speed(id);
        self.start_move(id, value, speed, true)
    }

    /// Hold the position for `millis` (driven by the timer), then complete
    pub fn no_movement(&mut self, id: ServoId, millis: u32) -> bool {
        let now = self.clock.now_ms();
        let Some(servo) = self.registry.get_mut(id) else {
            return false;
        };
        let interrupted = servo.no_movement(millis, now);
        self.enable_interrupts();
        interrupted
    }

    /// Advance one servo; true if it is idle (an empty slot counts as idle)
    pub fn step(&mut self, id: ServoId) -> bool {
        let now = self.clock.now_ms();
        match self.registry.get_mut(id) {
            Some(servo) => servo.step(&mut self.transport, now),
            None => true,
        }
    }

    /// Stop one servo where it is
    ///
    /// The timer is cancelled only if no other servo is still moving.
    pub fn stop(&mut self, id: ServoId) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.stop();
        }
        if !self.is_one_servo_moving() {
            self.disable_interrupts();
        }
    }

    /// Resume a stopped move and make sure the timer runs
    pub fn continue_with_interrupts(&mut self, id: ServoId) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.resume();
            self.enable_interrupts();
        }
    }

    /// Resume a stopped move, to be driven by the caller
    pub fn continue_without_interrupts(&mut self, id: ServoId) {
        if let Some(servo) = self.registry.get_mut(id) {
            servo.resume();
        }
    }

    pub fn is_moving(&self, id: ServoId) -> bool {
        self.registry.get(id).is_some_and(Servo::is_moving)
    }

    /// Current position in degree, None for an empty slot
    pub fn get_current_angle(&self, id: ServoId) -> Option<i32> {
        self.registry.get(id).map(Servo::current_angle)
    }

    pub fn get_end_units(&self, id: ServoId) -> Option<i32> {
        self.registry.get(id).map(Servo::end_units)
    }

    pub fn get_end_units_with_trim(&self, id: ServoId) -> Option<i32> {
        self.registry.get(id).map(Servo::end_units_with_trim)
    }

    pub fn get_delta_units(&self, id: ServoId) -> Option<i32> {
        self.registry.get(id).map(Servo::delta_units)
    }

    pub fn get_millis_for_complete_move(&self, id: ServoId) -> Option<u32> {
        self.registry.get(id).map(Servo::millis_for_complete_move)
    }

    pub fn degree_to_units_with_trim_and_reverse(&self, id: ServoId, degree: i32) -> Option<i32> {
        self.registry
            .get(id)
            .map(|servo| servo.degree_to_units_with_trim_and_reverse(degree))
    }

    pub fn snapshot(&self, id: ServoId) -> Option<MotionSnapshot> {
        self.registry.get(id).map(Servo::snapshot)
    }

    // -- Timer --

    /// Check if the periodic tick is armed
    pub fn are_interrupts_active(&self) -> bool {
        self.interrupts_active
    }

    /// Arm the periodic tick unless it already runs
    pub fn enable_interrupts(&mut self) {
        if !self.interrupts_active {
            #[cfg(feature = "defmt")]
            defmt::trace!("Servo tick on, every {} us", self.config.refresh_interval_us);
            self.interrupts_active = true;
            self.ticker.schedule_periodic(self.config.refresh_interval_us);
        }
    }

    /// Cancel the periodic tick
    pub fn disable_interrupts(&mut self) {
        if self.interrupts_active {
            #[cfg(feature = "defmt")]
            defmt::trace!("Servo tick off");
            self.interrupts_active = false;
            self.ticker.cancel_periodic();
        }
    }

    /// Periodic tick entry point
    ///
    /// Steps every servo and cancels the tick once all of them stopped.
    /// Returns true if all servos stopped.
    pub fn handle_timer_tick(&mut self) -> bool {
        let all_stopped = self.update_all_servos();
        if all_stopped {
            self.disable_interrupts();
        }
        all_stopped
    }

    // -- Batch operations --

    /// Write the same value to every servo
    pub fn write_all_servos(&mut self, value: i32) {
        for (servo, next) in self.registry.iter_with_next_mut() {
            servo.write(&mut self.transport, value);
            *next = value;
        }
    }

    pub fn set_speed_for_all_servos(&mut self, degrees_per_second: u16) {
        for (_, servo) in self.registry.iter_mut() {
            servo.set_speed(degrees_per_second);
        }
    }

    pub fn set_easing_type_for_all_servos(&mut self, easing: EasingType) {
        for (_, servo) in self.registry.iter_mut() {
            servo.set_easing_type(easing);
        }
    }

    /// Set the next position entries of slots 0, 1, ... in order
    pub fn set_degree_for_all_servos(&mut self, values: &[i32]) {
        self.registry.set_next_positions(values);
    }

    /// Next requested position of a slot
    pub fn next_position(&self, id: ServoId) -> Option<i32> {
        self.registry.next_position(id)
    }

    /// Plan moves of all servos to their next positions
    ///
    /// Uses each servo's stored speed, or `speed` for all of them. Does not
    /// start the timer. Returns true if any move in progress was replaced.
    pub fn set_ease_to_for_all_servos(&mut self, speed: Option<u16>) -> bool {
        let now = self.clock.now_ms();
        let mut interrupted = false;
        for (servo, next) in self.registry.iter_with_next_mut() {
            let speed = speed.unwrap_or(servo.speed());
            let millis = servo.millis_for_speed(*next, speed);
            interrupted |= servo.set_target_and_duration(*next, millis, now);
        }
        interrupted
    }

    /// Plan timed moves of all servos to their next positions
    pub fn set_ease_to_duration_for_all_servos(&mut self, millis: u32) -> bool {
        let now = self.clock.now_ms();
        let mut interrupted = false;
        for (servo, next) in self.registry.iter_with_next_mut() {
            interrupted |= servo.set_target_and_duration(*next, millis, now);
        }
        interrupted
    }

    pub fn is_one_servo_moving(&self) -> bool {
        self.registry.is_one_servo_moving()
    }

    /// Cancel the timer and stop every servo where it is
    pub fn stop_all_servos(&mut self) {
        self.disable_interrupts();
        for (_, servo) in self.registry.iter_mut() {
            servo.stop();
        }
    }

    /// Step every servo once; true if all of them are idle
    pub fn update_all_servos(&mut self) -> bool {
        let now = self.clock.now_ms();
        let mut all_stopped = true;
        for (_, servo) in self.registry.iter_mut() {
            all_stopped &= servo.step(&mut self.transport, now);
        }
        all_stopped
    }

    /// Give all moving servos the longest duration and one common start tick
    ///
    /// All durations are read before any is overwritten, so every servo
    /// arrives at the same tick. Optionally starts the timer.
    pub fn synchronize_all_servos_and_start_interrupt(&mut self, start_interrupt: bool) {
        let mut max_duration = 0;
        let mut start_ms = 0;
        for (_, servo) in self.registry.iter().filter(|(_, s)| s.is_moving()) {
            start_ms = servo.start_ms();
            max_duration = max_duration.max(servo.millis_for_complete_move());
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Synchronized start {} duration {}", start_ms, max_duration);

        for (_, servo) in self.registry.iter_mut() {
            if servo.is_moving() {
                servo.synchronize(max_duration, start_ms);
            }
        }

        if start_interrupt {
            self.enable_interrupts();
        }
    }

    /// Plan moves to the next positions, synchronize them and start the timer
    pub fn set_ease_to_for_all_servos_synchronize_and_start_interrupt(&mut self, speed: Option<u16>) {
        self.set_ease_to_for_all_servos(speed);
        self.synchronize_all_servos_and_start_interrupt(true);
    }

    // -- Blocking API --

    /// Move one servo at the stored speed and wait until it arrives
    pub fn ease_to<D: DelayNs>(&mut self, id: ServoId, value: i32, delay: &mut D) {
        let speed = self.get_speed(id);
        self.ease_to_with_speed(id, value, speed, delay);
    }

    /// Move one servo at `degrees_per_second` and wait until it arrives
    pub fn ease_to_with_speed<D: DelayNs>(
        &mut self,
        id: ServoId,
        value: i32,
        degrees_per_second: u16,
        delay: &mut D,
    ) {
        self.start_move(id, value, degrees_per_second, false);
        self.wait_for_servo(id, delay);
    }

    /// Move one servo in `millis` and wait until it arrives
    pub fn ease_to_duration<D: DelayNs>(&mut self, id: ServoId, value: i32, millis: u32, delay: &mut D) {
        self.start_move_with_duration(id, value, millis, false);
        self.wait_for_servo(id, delay);
    }

    fn wait_for_servo<D: DelayNs>(&mut self, id: ServoId, delay: &mut D) {
        let interval = self.config.refresh_interval_ms();
        loop {
            // Sleep first, right after arming there is nothing to move yet
            delay.delay_ms(interval);
            if self.step(id) {
                break;
            }
        }
    }

    /// Step all servos every refresh interval until all of them stopped
    pub fn update_and_wait_for_all_servos_to_stop<D: DelayNs>(&mut self, delay: &mut D) {
        let interval = self.config.refresh_interval_ms();
        loop {
            delay.delay_ms(interval);
            if self.update_all_servos() {
                break;
            }
        }
    }

    /// Wait `millis` while stepping all servos
    ///
    /// With `terminate_early` the wait ends as soon as all servos stopped.
    /// Returns true if all servos stopped.
    pub fn delay_and_update_and_wait_for_all_servos_to_stop<D: DelayNs>(
        &mut self,
        mut millis: u32,
        terminate_early: bool,
        delay: &mut D,
    ) -> bool {
        let interval = self.config.refresh_interval_ms();
        loop {
            if millis > interval {
                millis -= interval;
                delay.delay_ms(interval);
                if self.update_all_servos() && terminate_early {
                    return true;
                }
            } else {
                delay.delay_ms(millis);
                return self.update_all_servos();
            }
        }
    }

    /// Synchronize all armed moves and step them until they stopped
    pub fn synchronize_all_servos_start_and_wait_for_all_servos_to_stop<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) {
        self.synchronize_all_servos_and_start_interrupt(false);
        self.update_and_wait_for_all_servos_to_stop(delay);
    }

    /// Move all servos to their next positions together and wait
    pub fn synchronize_and_ease_to_array_positions<D: DelayNs>(
        &mut self,
        speed: Option<u16>,
        delay: &mut D,
    ) {
        self.set_ease_to_for_all_servos(speed);
        self.synchronize_all_servos_start_and_wait_for_all_servos_to_stop(delay);
    }

    // -- Async blocking API --

    /// Async variant of [`Self::ease_to`]
    pub async fn ease_to_async<D: AsyncDelayNs>(&mut self, id: ServoId, value: i32, delay: &mut D) {
        let speed = self.get_speed(id);
        self.start_move(id, value, speed, false);
        self.wait_for_servo_async(id, delay).await;
    }

    /// Async variant of [`Self::ease_to_duration`]
    pub async fn ease_to_duration_async<D: AsyncDelayNs>(
        &mut self,
        id: ServoId,
        value: i32,
        millis: u32,
        delay: &mut D,
    ) {
        self.start_move_with_duration(id, value, millis, false);
        self.wait_for_servo_async(id, delay).await;
    }

    async fn wait_for_servo_async<D: AsyncDelayNs>(&mut self, id: ServoId, delay: &mut D) {
        let interval = self.config.refresh_interval_ms();
        loop {
            delay.delay_ms(interval).await;
            if self.step(id) {
                break;
            }
        }
    }

    /// Async variant of [`Self::update_and_wait_for_all_servos_to_stop`]
    pub async fn update_and_wait_for_all_servos_to_stop_async<D: AsyncDelayNs>(
        &mut self,
        delay: &mut D,
    ) {
        let interval = self.config.refresh_interval_ms();
        loop {
            delay.delay_ms(interval).await;
            if self.update_all_servos() {
                break;
            }
        }
    }

    /// Async variant of [`Self::delay_and_update_and_wait_for_all_servos_to_stop`]
    pub async fn delay_and_update_and_wait_for_all_servos_to_stop_async<D: AsyncDelayNs>(
        &mut self,
        mut millis: u32,
        terminate_early: bool,
        delay: &mut D,
    ) -> bool {
        let interval = self.config.refresh_interval_ms();
        loop {
            if millis > interval {
                millis -= interval;
                delay.delay_ms(interval).await;
                if self.update_all_servos() && terminate_early {
                    return true;
                }
            } else {
                delay.delay_ms(millis).await;
                return self.update_all_servos();
            }
        }
    }

    /// Async variant of [`Self::synchronize_all_servos_start_and_wait_for_all_servos_to_stop`]
    pub async fn synchronize_all_servos_start_and_wait_for_all_servos_to_stop_async<
        D: AsyncDelayNs,
    >(
        &mut self,
        delay: &mut D,
    ) {
        self.synchronize_all_servos_and_start_interrupt(false);
        self.update_and_wait_for_all_servos_to_stop_async(delay).await;
    }

    /// Async variant of [`Self::synchronize_and_ease_to_array_positions`]
    pub async fn synchronize_and_ease_to_array_positions_async<D: AsyncDelayNs>(
        &mut self,
        speed: Option<u16>,
        delay: &mut D,
    ) {
        self.set_ease_to_for_all_servos(speed);
        self.synchronize_all_servos_start_and_wait_for_all_servos_to_stop_async(delay)
            .await;
    }
}
