//! Shared state between Embassy tasks
//!
//! The servo controller lives in an async mutex so that the tick task and
//! the application tasks can both reach it. Tick start/stop requests from
//! the controller travel to the tick task through a signal.

use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use glide_core::config::MAX_EXPANDER_SERVOS;
use glide_core::registry::EasingController;
use glide_drivers::servo::Pca9685;

use crate::platform::{EmbassyClock, SignalTicks};

/// Controller type used by this firmware
pub type ServoController = EasingController<
    Pca9685<I2c<'static, I2C0, Blocking>>,
    SignalTicks,
    EmbassyClock,
    MAX_EXPANDER_SERVOS,
>;

/// Request to the tick task
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum TickCommand {
    /// Tick every `interval_us`
    Start { interval_us: u32 },
    /// Stop ticking
    Stop,
}

/// Latest tick request; a newer request replaces an unread one
pub static TICK_COMMAND: Signal<CriticalSectionRawMutex, TickCommand> = Signal::new();

/// The servo controller, `None` until `main` has attached the servos
pub static CONTROLLER: Mutex<CriticalSectionRawMutex, Option<ServoController>> = Mutex::new(None);
