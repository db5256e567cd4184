//! Embassy implementations of the controller's time base traits

use embassy_time::Instant;
use glide_core::traits::{Clock, TickSource};

use crate::channels::{TickCommand, TICK_COMMAND};

/// Millisecond clock since boot
///
/// Wraps after about 49 days; the controller uses wrapping arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// Tick source that forwards start/stop requests to the tick task
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalTicks;

impl TickSource for SignalTicks {
    fn schedule_periodic(&mut self, interval_us: u32) {
        TICK_COMMAND.signal(TickCommand::Start { interval_us });
    }

    fn cancel_periodic(&mut self) {
        TICK_COMMAND.signal(TickCommand::Stop);
    }
}
