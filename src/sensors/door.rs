//! Magnetic reed-switch door contact.
//!
//! The switch connects the input to ground when the door magnet is near,
//! so with the internal pull-up enabled: LOW = door closed, HIGH = open.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the real GPIO level via hw_init helpers.
//! On host/test: defaults to door-closed (safe default).

use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::hw_init;
use crate::pins;

static SIM_DOOR_CLOSED: AtomicBool = AtomicBool::new(true);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_door_closed(closed: bool) {
    SIM_DOOR_CLOSED.store(closed, Ordering::Relaxed);
}

pub struct DoorContact;

impl DoorContact {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&mut self) -> bool {
        self.read_gpio()
    }

    #[cfg(target_os = "espidf")]
    fn read_gpio(&self) -> bool {
        // Active LOW: pulled-up pin reads low while the magnet holds the
        // reed closed.
        !hw_init::gpio_read(pins::DOOR_CONTACT_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_gpio(&self) -> bool {
        SIM_DOOR_CLOSED.load(Ordering::Relaxed)
    }
}

impl Default for DoorContact {
    fn default() -> Self {
        Self::new()
    }
}