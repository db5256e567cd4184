//! Demo sweep task
//!
//! Cycles three servos through a few moves: a synchronized non-blocking
//! move driven by the tick task, eased single moves one after another,
//! and a bouncing move that returns to its start.
//!
//! The controller lock is only held while planning a move. Waiting happens
//! with the lock released so the tick task keeps stepping the servos.

use defmt::*;
use embassy_time::{Duration, Timer};

use glide_core::config::REFRESH_INTERVAL_MS;
use glide_core::easing::EasingType;
use glide_core::registry::ServoId;

use crate::channels::CONTROLLER;

/// Servos driven by the demo
pub const DEMO_SERVOS: usize = 3;

/// Pause between demo moves
const PAUSE: Duration = Duration::from_millis(1000);

#[embassy_executor::task]
pub async fn sweep_task(servos: [ServoId; DEMO_SERVOS]) {
    info!("Sweep task started");

    loop {
        // All servos to 0, 90, 180 degree at once, arriving together
        {
            let mut guard = CONTROLLER.lock().await;
            let Some(controller) = guard.as_mut() else {
                return;
            };
            controller.set_speed_for_all_servos(60);
            controller.set_easing_type_for_all_servos(EasingType::CUBIC_IN_OUT);
            controller.set_degree_for_all_servos(&[0, 90, 180]);
            controller.set_ease_to_for_all_servos_synchronize_and_start_interrupt(None);
        }
        wait_for_all_servos_to_stop().await;
        Timer::after(PAUSE).await;

        // One servo at a time, each move finishes before the next starts
        for id in servos {
            {
                let mut guard = CONTROLLER.lock().await;
                let Some(controller) = guard.as_mut() else {
                    return;
                };
                controller.set_easing_type(id, EasingType::QUADRATIC_IN_OUT);
                controller.start_move_with_duration(id, 90, 800, true);
            }
            wait_for_all_servos_to_stop().await;
        }
        Timer::after(PAUSE).await;

        // Bounce the middle servo to 135 degree and back
        {
            let mut guard = CONTROLLER.lock().await;
            let Some(controller) = guard.as_mut() else {
                return;
            };
            controller.set_easing_type(servos[1], EasingType::SINE_BOUNCING);
            controller.start_move(servos[1], 135, 45, true);
            let snapshot = controller.snapshot(servos[1]);
            if let Some(snapshot) = snapshot {
                debug!(
                    "Bounce: {} -> {} in {} ms",
                    snapshot.current_degree, snapshot.end_degree, snapshot.duration_ms
                );
            }
        }
        wait_for_all_servos_to_stop().await;
        Timer::after(PAUSE).await;
    }
}

/// Poll once per refresh interval until the tick task has stopped every servo
async fn wait_for_all_servos_to_stop() {
    loop {
        Timer::after_millis(REFRESH_INTERVAL_MS as u64).await;
        let guard = CONTROLLER.lock().await;
        match guard.as_ref() {
            Some(controller) if controller.is_one_servo_moving() => {}
            _ => break,
        }
    }
}
