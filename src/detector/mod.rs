//! Function-pointer phase machine for crossing detection.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                 │
//! │  ┌───────────────────────────┬──────────┬─────────────────┐ │
//! │  │ Phase                     │ on_enter │ on_update        │ │
//! │  ├───────────────────────────┼──────────┼─────────────────┤ │
//! │  │ Calibrating               │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ Idle                      │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ AwaitingMotion            │ —        │ fn(ctx)->Option │ │
//! │  │ AwaitingRangeConfirmation │ —        │ fn(ctx)->Option │ │
//! │  │ ConfirmingEntrance        │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ ConfirmingExit            │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ CoolingDown               │ —        │ fn(ctx)->Option │ │
//! │  └───────────────────────────┴──────────┴─────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine clears the context's event list, applies the
//! door-close override, then calls `on_update` for the **current** phase.
//! If the handler returns `Some(next)`, the engine updates the current
//! pointer and runs `on_enter` for the next phase.  All functions receive
//! `&mut DetectorContext`, which holds the sensor snapshot, calibration,
//! emitted events, config, and timing.
//!
//! `tick` is total: every reachable (phase, snapshot) pair has a defined
//! transition, and arbitrarily many unavailable readings leave the machine
//! well-defined.

pub mod calibration;
pub mod context;
pub mod phases;

use context::{CrossingEvent, DetectorContext};
use log::info;

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all detection phases.
/// Must stay in sync with the table built in [`phases::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Calibrating = 0,
    Idle = 1,
    AwaitingMotion = 2,
    AwaitingRangeConfirmation = 3,
    ConfirmingEntrance = 4,
    ConfirmingExit = 5,
    CoolingDown = 6,
}

impl Phase {
    /// Total number of phases — used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert a `usize` index back to `Phase`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Calibrating,
            1 => Self::Idle,
            2 => Self::AwaitingMotion,
            3 => Self::AwaitingRangeConfirmation,
            4 => Self::ConfirmingEntrance,
            5 => Self::ConfirmingExit,
            6 => Self::CoolingDown,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Idle
            }
        }
    }

    /// The polling period the driver should sleep for while in this phase.
    ///
    /// Slowest while nothing is expected to happen, fastest while watching
    /// for the first beam break, intermediate while confirming.
    pub fn recommended_period_ms(self, config: &SystemConfig) -> u32 {
        match self {
            Self::Calibrating | Self::Idle => config.idle_period_ms,
            Self::AwaitingMotion => config.armed_period_ms,
            Self::AwaitingRangeConfirmation => config.range_period_ms,
            Self::ConfirmingEntrance | Self::ConfirmingExit | Self::CoolingDown => {
                config.confirm_period_ms
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions, run exactly once per transition.
pub type PhaseActionFn = fn(&mut DetectorContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type PhaseUpdateFn = fn(&mut DetectorContext) -> Option<Phase>;

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct PhaseDescriptor {
    pub id: Phase,
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

// ---------------------------------------------------------------------------
// Detector engine
// ---------------------------------------------------------------------------

/// The crossing-detection phase machine.
///
/// Owns the phase table (array of [`PhaseDescriptor`]) and is driven by a
/// mutable [`DetectorContext`] threaded through every handler call.
pub struct Detector {
    /// Fixed-size table indexed by `Phase as usize`.
    table: [PhaseDescriptor; Phase::COUNT],
    /// Index of the currently active phase.
    current: usize,
}

impl Detector {
    /// Construct a new detector with the given table, starting in `initial`.
    pub fn new(table: [PhaseDescriptor; Phase::COUNT], initial: Phase) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting phase.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut DetectorContext) {
        info!("detector starting in phase: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the detector by one tick.
    ///
    /// 1. Clear the context's event list.
    /// 2. Door-close override: a closed door interrupts any phase except
    ///    `Idle` (already there) and `Calibrating` (the burst must finish),
    ///    emitting `DoorClosed` and discarding any confirmation in progress.
    ///    Nothing else runs that tick, so a crossing event can never share a
    ///    tick with the override.
    /// 3. Otherwise call `on_update` for the current phase and execute the
    ///    transition it requests, if any.
    ///
    /// Events emitted this tick are left in `ctx.events`.
    pub fn tick(&mut self, ctx: &mut DetectorContext) {
        ctx.events.clear();

        let current = self.current_phase();
        if ctx.sensors.door_closed
            && current != Phase::Idle
            && current != Phase::Calibrating
        {
            ctx.emit(CrossingEvent::DoorClosed);
            self.transition(Phase::Idle, ctx);
            return;
        }

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by the application layer for an
    /// explicit re-calibration request).
    pub fn force_transition(&mut self, next: Phase, ctx: &mut DetectorContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current phase's identity.
    pub fn current_phase(&self) -> Phase {
        Phase::from_index(self.current)
    }

    /// Sleep period the driver loop should use until the next tick.
    pub fn recommended_period_ms(&self, config: &SystemConfig) -> u32 {
        self.current_phase().recommended_period_ms(config)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: Phase, ctx: &mut DetectorContext) {
        let next_idx = next_id as usize;

        info!(
            "phase transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::DetectorContext;
    use super::*;
    use crate::config::SystemConfig;
    use crate::detector::calibration::Calibration;

    fn make_ctx() -> DetectorContext {
        DetectorContext::new(SystemConfig::default())
    }

    fn make_detector() -> Detector {
        Detector::new(phases::build_phase_table(), Phase::Calibrating)
    }

    /// Detector forced past calibration with round-number baselines.
    fn calibrated(phase: Phase) -> (Detector, DetectorContext) {
        let mut detector = make_detector();
        let mut ctx = make_ctx();
        detector.start(&mut ctx);
        ctx.calibration = Calibration {
            baseline_inner_mm: 1000,
            baseline_outer_mm: 1000,
            tolerance_mm: 100,
        };
        ctx.sensors.door_closed = false;
        ctx.sensors.inner_mm = Some(1000);
        ctx.sensors.outer_mm = Some(1000);
        detector.force_transition(phase, &mut ctx);
        (detector, ctx)
    }

    #[test]
    fn starts_in_calibrating() {
        let detector = make_detector();
        assert_eq!(detector.current_phase(), Phase::Calibrating);
    }

    #[test]
    fn calibration_burst_completes_to_idle() {
        let mut detector = make_detector();
        let mut ctx = make_ctx();
        detector.start(&mut ctx);

        ctx.sensors.inner_mm = Some(1000);
        ctx.sensors.outer_mm = Some(1000);
        for _ in 0..ctx.config.calibration_samples {
            detector.tick(&mut ctx);
        }
        assert_eq!(detector.current_phase(), Phase::Idle);
        assert_eq!(ctx.calibration.baseline_inner_mm, 1000);
        assert_eq!(ctx.calibration.tolerance_mm, 300);
    }

    #[test]
    fn closed_door_does_not_interrupt_calibration() {
        let mut detector = make_detector();
        let mut ctx = make_ctx();
        detector.start(&mut ctx);

        ctx.sensors.door_closed = true;
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::Calibrating);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn idle_arms_when_door_open() {
        let (mut detector, mut ctx) = calibrated(Phase::Idle);
        ctx.sensors.door_closed = false;
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::AwaitingMotion);
        assert_eq!(ctx.events.as_slice(), &[CrossingEvent::DoorOpened]);
    }

    #[test]
    fn idle_stays_while_door_closed() {
        let (mut detector, mut ctx) = calibrated(Phase::Idle);
        ctx.sensors.door_closed = true;
        for _ in 0..5 {
            detector.tick(&mut ctx);
            assert_eq!(detector.current_phase(), Phase::Idle);
            assert!(ctx.events.is_empty());
        }
    }

    #[test]
    fn motion_advances_to_range_watch() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingMotion);
        ctx.sensors.motion = true;
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::AwaitingRangeConfirmation);
    }

    #[test]
    fn motion_tick_also_evaluates_beams() {
        // A beam already broken on the motion tick skips the range watch.
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingMotion);
        ctx.sensors.motion = true;
        ctx.sensors.inner_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::ConfirmingEntrance);
    }

    #[test]
    fn motion_loss_rearms_without_counting() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingRangeConfirmation);
        ctx.sensors.motion = false;
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::AwaitingMotion);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn inner_beam_selects_entrance() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingRangeConfirmation);
        ctx.sensors.motion = true;
        ctx.sensors.inner_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::ConfirmingEntrance);
    }

    #[test]
    fn outer_beam_selects_exit() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingRangeConfirmation);
        ctx.sensors.motion = true;
        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::ConfirmingExit);
    }

    #[test]
    fn simultaneous_beams_tie_break_to_entrance() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingRangeConfirmation);
        ctx.sensors.motion = true;
        ctx.sensors.inner_mm = Some(400);
        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::ConfirmingEntrance);
    }

    #[test]
    fn entrance_confirmed_by_outer_beam() {
        let (mut detector, mut ctx) = calibrated(Phase::ConfirmingEntrance);
        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::CoolingDown);
        assert_eq!(ctx.events.as_slice(), &[CrossingEvent::Entrance]);
    }

    #[test]
    fn exit_confirmed_by_inner_beam() {
        let (mut detector, mut ctx) = calibrated(Phase::ConfirmingExit);
        ctx.sensors.inner_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::CoolingDown);
        assert_eq!(ctx.events.as_slice(), &[CrossingEvent::Exit]);
    }

    #[test]
    fn inversion_swaps_emitted_tokens() {
        let (mut detector, mut ctx) = calibrated(Phase::ConfirmingEntrance);
        ctx.set_direction_inversion(true);
        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(ctx.events.as_slice(), &[CrossingEvent::Exit]);

        let (mut detector, mut ctx) = calibrated(Phase::ConfirmingExit);
        ctx.set_direction_inversion(true);
        ctx.sensors.inner_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(ctx.events.as_slice(), &[CrossingEvent::Entrance]);
    }

    #[test]
    fn confirmation_times_out_silently() {
        // 150 ticks of 20 ms reach the 3000 ms window exactly.
        let (mut detector, mut ctx) = calibrated(Phase::ConfirmingEntrance);
        ctx.config.confirm_period_ms = 20;

        for tick in 1..=150u32 {
            detector.tick(&mut ctx);
            assert!(ctx.events.is_empty(), "no event expected at tick {tick}");
            if tick < 150 {
                assert_eq!(detector.current_phase(), Phase::ConfirmingEntrance);
            }
        }
        assert_eq!(detector.current_phase(), Phase::CoolingDown);
    }

    #[test]
    fn door_close_overrides_every_armed_phase() {
        for phase in [
            Phase::AwaitingMotion,
            Phase::AwaitingRangeConfirmation,
            Phase::ConfirmingEntrance,
            Phase::ConfirmingExit,
            Phase::CoolingDown,
        ] {
            let (mut detector, mut ctx) = calibrated(phase);
            ctx.sensors.door_closed = true;
            // Beams broken at the same time must not produce a crossing.
            ctx.sensors.inner_mm = Some(400);
            ctx.sensors.outer_mm = Some(400);
            detector.tick(&mut ctx);
            assert_eq!(
                detector.current_phase(),
                Phase::Idle,
                "expected Idle from {phase:?}"
            );
            assert_eq!(ctx.events.as_slice(), &[CrossingEvent::DoorClosed]);
        }
    }

    #[test]
    fn cooling_down_waits_for_both_beams() {
        let (mut detector, mut ctx) = calibrated(Phase::CoolingDown);
        ctx.sensors.inner_mm = Some(400);
        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::CoolingDown);

        ctx.sensors.inner_mm = Some(1000);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::CoolingDown);

        ctx.sensors.outer_mm = Some(1000);
        detector.tick(&mut ctx);
        assert_eq!(detector.current_phase(), Phase::AwaitingMotion);
    }

    #[test]
    fn unavailable_readings_hold_range_watch() {
        let (mut detector, mut ctx) = calibrated(Phase::AwaitingRangeConfirmation);
        ctx.sensors.motion = true;
        ctx.sensors.inner_mm = None;
        ctx.sensors.outer_mm = None;
        for _ in 0..1000 {
            detector.tick(&mut ctx);
            assert_eq!(detector.current_phase(), Phase::AwaitingRangeConfirmation);
            assert!(ctx.events.is_empty());
        }
    }

    #[test]
    fn end_to_end_entrance() {
        let mut detector = make_detector();
        let mut ctx = make_ctx();
        // Pin the tolerance the scenario wants: 10% of a 1000 mm mean.
        ctx.config.tolerance_percent = 10;
        detector.start(&mut ctx);

        ctx.sensors.inner_mm = Some(1000);
        ctx.sensors.outer_mm = Some(1000);
        for _ in 0..ctx.config.calibration_samples {
            detector.tick(&mut ctx);
        }
        assert_eq!(detector.current_phase(), Phase::Idle);
        assert_eq!(ctx.calibration.tolerance_mm, 100);

        let mut emitted = std::vec::Vec::new();

        ctx.sensors.door_closed = false;
        detector.tick(&mut ctx);
        emitted.extend_from_slice(ctx.events.as_slice());
        assert_eq!(detector.current_phase(), Phase::AwaitingMotion);

        ctx.sensors.motion = true;
        detector.tick(&mut ctx);
        emitted.extend_from_slice(ctx.events.as_slice());
        assert_eq!(detector.current_phase(), Phase::AwaitingRangeConfirmation);

        ctx.sensors.inner_mm = Some(400);
        detector.tick(&mut ctx);
        emitted.extend_from_slice(ctx.events.as_slice());
        assert_eq!(detector.current_phase(), Phase::ConfirmingEntrance);

        ctx.sensors.outer_mm = Some(400);
        detector.tick(&mut ctx);
        emitted.extend_from_slice(ctx.events.as_slice());
        assert_eq!(detector.current_phase(), Phase::CoolingDown);

        ctx.sensors.inner_mm = Some(1000);
        ctx.sensors.outer_mm = Some(1000);
        detector.tick(&mut ctx);
        emitted.extend_from_slice(ctx.events.as_slice());
        assert_eq!(detector.current_phase(), Phase::AwaitingMotion);

        assert_eq!(
            emitted,
            vec![CrossingEvent::DoorOpened, CrossingEvent::Entrance]
        );
    }

    #[test]
    fn recommended_periods_follow_phase() {
        let config = SystemConfig::default();
        assert_eq!(
            Phase::Idle.recommended_period_ms(&config),
            config.idle_period_ms
        );
        assert_eq!(
            Phase::AwaitingMotion.recommended_period_ms(&config),
            config.armed_period_ms
        );
        assert_eq!(
            Phase::AwaitingRangeConfirmation.recommended_period_ms(&config),
            config.range_period_ms
        );
        assert_eq!(
            Phase::CoolingDown.recommended_period_ms(&config),
            config.confirm_period_ms
        );
    }

    #[test]
    fn phase_from_index_roundtrip() {
        for i in 0..Phase::COUNT {
            let id = Phase::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn phase_from_invalid_index_returns_idle() {
        let id = Phase::from_index(99);
        assert_eq!(id, Phase::Idle);
    }
}
