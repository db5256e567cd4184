//! Glide - servo easing demo firmware
//!
//! Drives three hobby servos on a PCA9685 expander from an RP2040. The
//! controller lives in a shared mutex; the tick task steps it every 20 ms
//! while servos move and the sweep task plans the moves.
//!
//! Wiring: I2C0 with SDA on GPIO4 and SCL on GPIO5, servos on expander
//! channels 0..=2.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::i2c::{self, I2c};
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use glide_core::config::EasingConfig;
use glide_drivers::servo::{pca9685, Pca9685};

use crate::channels::{ServoController, CONTROLLER};
use crate::platform::{EmbassyClock, SignalTicks};

mod channels;
mod platform;
mod tasks;

/// I2C clock for the expander
const I2C_FREQUENCY_HZ: u32 = 400_000;

/// Start position of every servo
const START_DEGREE: i32 = 90;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Glide firmware starting...");

    let p = embassy_rp::init(Default::default());

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY_HZ;
    let bus = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);

    let mut expander = Pca9685::new(bus, pca9685::DEFAULT_ADDRESS);
    if !expander.check_connection() {
        error!("PCA9685 not found, check wiring");
        return;
    }
    if let Err(e) = expander.reset() {
        warn!("PCA9685 reset failed: {}", e);
    }
    if let Err(e) = expander.init(&mut Delay) {
        error!("PCA9685 init failed: {}", e);
        return;
    }
    info!("PCA9685 initialized");

    let mut controller =
        ServoController::new(expander, SignalTicks, EmbassyClock, EasingConfig::default());

    let (Ok(left), Ok(middle), Ok(right)) = (
        controller.attach_default(0),
        controller.attach_default(1),
        controller.attach_default(2),
    ) else {
        error!("Servo attach failed");
        return;
    };
    controller.write_all_servos(START_DEGREE);
    info!("{} servos attached", controller.registry().len());

    *CONTROLLER.lock().await = Some(controller);

    spawner.spawn(tasks::tick_task()).unwrap();
    spawner
        .spawn(tasks::sweep_task([left, middle, right]))
        .unwrap();

    info!("All tasks spawned, firmware running");
}
