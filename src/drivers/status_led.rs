//! Discrete three-colour status LED driver.
//!
//! Three separate LEDs (green / yellow / red) on plain GPIO outputs,
//! exactly one lit at a time.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO pins via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Off,
    Green,
    Yellow,
    Red,
}

pub struct StatusLed {
    current: Colour,
}

impl StatusLed {
    pub fn new() -> Self {
        Self {
            current: Colour::Off,
        }
    }

    pub fn set_colour(&mut self, colour: Colour) {
        hw_init::gpio_write(pins::LED_GREEN_GPIO, colour == Colour::Green);
        hw_init::gpio_write(pins::LED_YELLOW_GPIO, colour == Colour::Yellow);
        hw_init::gpio_write(pins::LED_RED_GPIO, colour == Colour::Red);
        self.current = colour;
    }

    pub fn off(&mut self) {
        self.set_colour(Colour::Off);
    }

    pub fn current_colour(&self) -> Colour {
        self.current
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
