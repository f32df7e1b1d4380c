//! Passive infrared (PIR) motion sensor.
//!
//! An HC-SR501 style module that drives its output HIGH while gross motion
//! is present; retriggering and hold time happen inside the module.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the real GPIO level via hw_init helpers.
//! On host/test: defaults to no-motion.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::hw_init;
use crate::pins;

static SIM_MOTION: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_motion(detected: bool) {
    SIM_MOTION.store(detected, Ordering::Relaxed);
}

pub struct MotionSensor;

impl MotionSensor {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&mut self) -> bool {
        self.read_gpio()
    }

    #[cfg(target_os = "espidf")]
    fn read_gpio(&self) -> bool {
        hw_init::gpio_read(pins::PIR_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_gpio(&self) -> bool {
        SIM_MOTION.load(Ordering::Relaxed)
    }
}

impl Default for MotionSensor {
    fn default() -> Self {
        Self::new()
    }
}
