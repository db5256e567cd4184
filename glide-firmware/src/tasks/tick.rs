//! Servo refresh tick task
//!
//! Sleeps until the controller arms its timer, then calls
//! `handle_timer_tick` every refresh interval until the controller
//! cancels the timer again (once all servos stopped).

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};

use crate::channels::{TickCommand, CONTROLLER, TICK_COMMAND};

#[embassy_executor::task]
pub async fn tick_task() {
    info!("Tick task started");

    loop {
        let TickCommand::Start { interval_us } = TICK_COMMAND.wait().await else {
            continue;
        };
        debug!("Servo ticks every {} us", interval_us);
        let mut ticker = Ticker::every(Duration::from_micros(interval_us as u64));

        loop {
            match select(ticker.next(), TICK_COMMAND.wait()).await {
                Either::First(()) => {
                    let mut controller = CONTROLLER.lock().await;
                    if let Some(controller) = controller.as_mut() {
                        controller.handle_timer_tick();
                    }
                }
                Either::Second(TickCommand::Start { interval_us }) => {
                    ticker = Ticker::every(Duration::from_micros(interval_us as u64));
                }
                Either::Second(TickCommand::Stop) => {
                    debug!("Servo ticks stopped");
                    break;
                }
            }
        }
    }
}
