//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the feedback devices, exposing them through
//! [`SensorPort`] and [`FeedbackPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation stubs.

use crate::app::events::Feedback;
use crate::app::ports::{FeedbackPort, SensorPort};
use crate::drivers::speaker::Speaker;
use crate::drivers::status_led::{Colour, StatusLed};
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    led: StatusLed,
    speaker: Speaker,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, led: StatusLed, speaker: Speaker) -> Self {
        Self {
            sensor_hub,
            led,
            speaker,
        }
    }

    /// Bring the ranging sensors out of reset before the first tick.
    pub fn start_sensors(&mut self) {
        self.sensor_hub.start_ranging();
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn sample_inner(&mut self) -> Option<u16> {
        self.sensor_hub.inner.read()
    }

    fn sample_outer(&mut self) -> Option<u16> {
        self.sensor_hub.outer.read()
    }

    fn door_closed(&mut self) -> bool {
        self.sensor_hub.door.read()
    }

    fn motion_detected(&mut self) -> bool {
        self.sensor_hub.motion.read()
    }
}

// ── FeedbackPort implementation ───────────────────────────────

impl FeedbackPort for HardwareAdapter {
    fn render(&mut self, signal: Feedback, now_ms: u32) {
        match signal {
            Feedback::Idle => self.led.off(),
            Feedback::Confirming => self.led.set_colour(Colour::Yellow),
            Feedback::Success => {
                // Green holds through the cool-down, then the re-arm
                // renders Idle and clears it.
                self.led.set_colour(Colour::Green);
                self.speaker.play_success(now_ms);
            }
        }
    }

    fn update(&mut self, now_ms: u32) {
        self.speaker.update(now_ms);
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::sensors::door::DoorContact;
    use crate::sensors::motion::MotionSensor;
    use crate::sensors::ranging::{Position, RangingSensor};

    fn adapter() -> HardwareAdapter {
        let hub = SensorHub::new(
            RangingSensor::new(Position::Inner),
            RangingSensor::new(Position::Outer),
            DoorContact::new(),
            MotionSensor::new(),
        );
        HardwareAdapter::new(hub, StatusLed::new(), Speaker::new())
    }

    #[test]
    fn feedback_signals_drive_led_and_speaker() {
        let mut hw = adapter();

        hw.render(Feedback::Confirming, 0);
        assert_eq!(hw.led.current_colour(), Colour::Yellow);
        assert!(!hw.speaker.is_playing());

        hw.render(Feedback::Success, 100);
        assert_eq!(hw.led.current_colour(), Colour::Green);
        assert!(hw.speaker.is_playing());

        hw.render(Feedback::Idle, 200);
        assert_eq!(hw.led.current_colour(), Colour::Off);
    }
}
