//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the detector phase machine and its shared context.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                  │       AppService        │
//! FeedbackPort ◀── │   Detector · Config     │ ◀── ConnectivityPort
//!                  └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::detector::calibration::Calibration;
use crate::detector::context::{CrossingEvent, DetectorContext, SensorSnapshot};
use crate::detector::phases::build_phase_table;
use crate::detector::{Detector, Phase};

use super::commands::AppCommand;
use super::events::{AppEvent, Feedback};
use super::ports::{ConfigPort, ConnectivityPort, EventSink, FeedbackPort, SensorPort};

/// Unsaved settings are flushed this long after the last change.
const AUTO_SAVE_DELAY_MS: u32 = 5000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    detector: Detector,
    ctx: DetectorContext,
    /// Milliseconds of accumulated sleep time, advanced each tick by the
    /// period the driver slept before calling in.
    uptime_ms: u32,
    /// The period handed to the driver at the end of the previous tick.
    last_period_ms: u32,
    config_dirty: bool,
    dirty_since_ms: u32,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the detector — call [`AppService::start`] next.
    pub fn new(config: SystemConfig) -> Self {
        let ctx = DetectorContext::new(config);
        let detector = Detector::new(build_phase_table(), Phase::Calibrating);

        Self {
            detector,
            ctx,
            uptime_ms: 0,
            last_period_ms: 0,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the detector in its initial phase (Calibrating).
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.detector.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.detector.current_phase()));
        info!("AppService started in {:?}", self.detector.current_phase());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: read sensors → detector tick → publish
    /// events → feedback.  Returns the period in milliseconds the driver
    /// should sleep before the next call.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`FeedbackPort`], and `sink` satisfies both [`EventSink`] and
    /// [`ConnectivityPort`] — this avoids double mutable borrows while
    /// keeping the port boundaries explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + FeedbackPort),
        sink: &mut (impl EventSink + ConnectivityPort),
    ) -> u32 {
        self.uptime_ms = self.uptime_ms.wrapping_add(self.last_period_ms);
        let now = self.uptime_ms;
        let prev_phase = self.detector.current_phase();

        // 1. Poll every sensor via SensorPort
        self.ctx.sensors = SensorSnapshot {
            inner_mm: hw.sample_inner(),
            outer_mm: hw.sample_outer(),
            door_closed: hw.door_closed(),
            motion: hw.motion_detected(),
        };

        // 2. Detector tick (pure phase logic)
        self.detector.tick(&mut self.ctx);
        let new_phase = self.detector.current_phase();

        // 3. Publish this tick's events.  Crossings and door events are not
        //    queued: with the link down they are dropped (the detector's own
        //    logging still records them on serial).
        let mut crossing_confirmed = false;
        for &event in self.ctx.events.iter() {
            if matches!(event, CrossingEvent::Entrance | CrossingEvent::Exit) {
                crossing_confirmed = true;
            }
            if sink.link_available() {
                sink.emit(&AppEvent::Crossing(event));
            } else {
                warn!("link down, dropping {:?}", event);
            }
        }

        // 4. Phase-change bookkeeping
        if new_phase != prev_phase {
            if prev_phase == Phase::Calibrating {
                sink.emit(&AppEvent::CalibrationDone {
                    baseline_inner_mm: self.ctx.calibration.baseline_inner_mm,
                    baseline_outer_mm: self.ctx.calibration.baseline_outer_mm,
                    tolerance_mm: self.ctx.calibration.tolerance_mm,
                });
            }
            sink.emit(&AppEvent::PhaseChanged {
                from: prev_phase,
                to: new_phase,
            });
        }

        // 5. Feedback: a confirmed crossing wins over the steady-state
        //    signal; otherwise re-render only when the phase moved.
        if crossing_confirmed {
            hw.render(Feedback::Success, now);
        } else if new_phase != prev_phase {
            hw.render(Feedback::for_phase(new_phase), now);
        }
        hw.update(now);

        // 6. Variable-period policy: the new phase decides how long the
        //    driver sleeps until the next tick.
        let period = self.detector.recommended_period_ms(&self.ctx.config);
        self.last_period_ms = period;
        period
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from serial console or control topic).
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) {
        match cmd {
            AppCommand::SetDirectionInversion(invert) => {
                self.ctx.set_direction_inversion(invert);
                self.mark_config_dirty();
                info!("direction inversion set to {invert}");
            }
            AppCommand::Recalibrate => {
                let prev = self.detector.current_phase();
                self.detector.force_transition(Phase::Calibrating, &mut self.ctx);
                sink.emit(&AppEvent::PhaseChanged {
                    from: prev,
                    to: Phase::Calibrating,
                });
                info!("re-calibration requested");
            }
            AppCommand::SaveSettings => {
                // Rewind the debounce window so the next auto-save check flushes.
                self.mark_config_dirty();
                self.dirty_since_ms = self.uptime_ms.wrapping_sub(AUTO_SAVE_DELAY_MS);
                info!("explicit settings save requested");
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current detection phase.
    pub fn phase(&self) -> Phase {
        self.detector.current_phase()
    }

    /// The calibration in effect (all-zero until the burst completes).
    pub fn calibration(&self) -> Calibration {
        self.ctx.calibration
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.ctx.config.clone()
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = self.uptime_ms;
        }
    }

    /// Check if auto-save should trigger (5 seconds after last change).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if self.uptime_ms.wrapping_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("settings auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("settings auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before shutdown or deep sleep).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("settings force-saved before shutdown");
            }
            Err(e) => {
                warn!("settings force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_calibrating() {
        let app = AppService::new(SystemConfig::default());
        assert_eq!(app.phase(), Phase::Calibrating);
    }

    #[test]
    fn inversion_command_dirties_config() {
        let mut app = AppService::new(SystemConfig::default());
        let mut sink = DropSink;
        assert!(!app.is_config_dirty());
        app.handle_command(AppCommand::SetDirectionInversion(true), &mut sink);
        assert!(app.is_config_dirty());
        assert!(app.current_config().invert_direction);
    }

    struct DropSink;
    impl EventSink for DropSink {
        fn emit(&mut self, _event: &AppEvent) {}
    }
}
