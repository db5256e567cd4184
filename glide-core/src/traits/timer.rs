//! Time base and periodic tick traits
//!
//! The controller needs a millisecond clock to time trajectories and a
//! periodic tick source that calls back into it while servos move.

/// Monotonic millisecond clock
///
/// The value may wrap; elapsed times are computed with wrapping arithmetic.
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Periodic timer facility
///
/// Once started, the platform calls
/// [`EasingController::handle_timer_tick`](crate::registry::EasingController::handle_timer_tick)
/// every `interval_us` until `cancel_periodic` is called. At most one
/// registration is active at a time.
pub trait TickSource {
    /// Start (or restart) periodic ticks
    fn schedule_periodic(&mut self, interval_us: u32);

    /// Stop periodic ticks
    fn cancel_periodic(&mut self);
}

impl<K: TickSource + ?Sized> TickSource for &mut K {
    fn schedule_periodic(&mut self, interval_us: u32) {
        (**self).schedule_periodic(interval_us)
    }

    fn cancel_periodic(&mut self) {
        (**self).cancel_periodic()
    }
}

/// Tick source for callers that only use the blocking API
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTicks;

impl TickSource for NoTicks {
    fn schedule_periodic(&mut self, _interval_us: u32) {}

    fn cancel_periodic(&mut self) {}
}
