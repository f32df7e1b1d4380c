//! Hardware drivers — peripheral bring-up and user-feedback devices.

pub mod hw_init;
pub mod speaker;
pub mod status_led;
