//! Concrete phase handler functions and table builder.
//!
//! Each phase is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap.  This is the classic embedded C FSM pattern expressed
//! in safe Rust.
//!
//! ```text
//!  CALIBRATING ──[burst done]──▶ IDLE ──[door opens]──▶ AWAITING_MOTION
//!                                                            │
//!                                                       [motion seen]
//!                                                            ▼
//!            ┌── [inner beam first] ── AWAITING_RANGE ──[motion lost]──▶ (back)
//!            ▼                              │
//!    CONFIRMING_ENTRANCE        [outer beam first]
//!            │                              ▼
//!    [outer within 3 s]             CONFIRMING_EXIT ──[inner within 3 s]──┐
//!            │                              │                             │
//!            ▼                         [timeout]                          ▼
//!      COOLING_DOWN ◀───────────────────────┴──────────── emit crossing ──┘
//!            │
//!      [both beams clear] ──▶ AWAITING_MOTION
//!
//!  Any phase but IDLE/CALIBRATING ──[door closes]──▶ IDLE  (engine override)
//! ```

use super::context::DetectorContext;
use super::{Phase, PhaseDescriptor};
use crate::detector::calibration::Calibrator;
use crate::detector::context::CrossingEvent;
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; Phase::COUNT] {
    [
        // Index 0 — Calibrating
        PhaseDescriptor {
            id: Phase::Calibrating,
            name: "Calibrating",
            on_enter: Some(calibrating_enter),
            on_update: calibrating_update,
        },
        // Index 1 — Idle
        PhaseDescriptor {
            id: Phase::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_update: idle_update,
        },
        // Index 2 — AwaitingMotion
        PhaseDescriptor {
            id: Phase::AwaitingMotion,
            name: "AwaitingMotion",
            on_enter: None,
            on_update: awaiting_motion_update,
        },
        // Index 3 — AwaitingRangeConfirmation
        PhaseDescriptor {
            id: Phase::AwaitingRangeConfirmation,
            name: "AwaitingRangeConfirmation",
            on_enter: None,
            on_update: awaiting_range_update,
        },
        // Index 4 — ConfirmingEntrance
        PhaseDescriptor {
            id: Phase::ConfirmingEntrance,
            name: "ConfirmingEntrance",
            on_enter: Some(confirming_enter),
            on_update: confirming_entrance_update,
        },
        // Index 5 — ConfirmingExit
        PhaseDescriptor {
            id: Phase::ConfirmingExit,
            name: "ConfirmingExit",
            on_enter: Some(confirming_enter),
            on_update: confirming_exit_update,
        },
        // Index 6 — CoolingDown
        PhaseDescriptor {
            id: Phase::CoolingDown,
            name: "CoolingDown",
            on_enter: None,
            on_update: cooling_down_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  CALIBRATING — averaging the baseline burst
// ═══════════════════════════════════════════════════════════════════════════

fn calibrating_enter(ctx: &mut DetectorContext) {
    ctx.calibrator = Calibrator::new(&ctx.config);
    info!(
        "CALIBRATING: averaging {} ranging samples",
        ctx.config.calibration_samples
    );
}

fn calibrating_update(ctx: &mut DetectorContext) -> Option<Phase> {
    let (inner, outer) = (ctx.sensors.inner_mm, ctx.sensors.outer_mm);
    if let Some(result) = ctx.calibrator.feed(inner, outer) {
        ctx.calibration = result;
        return Some(Phase::Idle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE — door shut, slow polling
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(_ctx: &mut DetectorContext) {
    info!("IDLE: door shut, waiting");
}

fn idle_update(ctx: &mut DetectorContext) -> Option<Phase> {
    // Level check, not edge: a door found already open (including at boot)
    // is announced the same way as one that just opened.
    if !ctx.sensors.door_closed {
        ctx.emit(CrossingEvent::DoorOpened);
        return Some(Phase::AwaitingMotion);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_MOTION — door open, armed, polling the PIR
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_motion_update(ctx: &mut DetectorContext) -> Option<Phase> {
    if ctx.sensors.motion {
        // The tick that sees motion also evaluates the beams: a person close
        // enough to already break one goes straight to confirmation.
        return Some(range_decision(ctx).unwrap_or(Phase::AwaitingRangeConfirmation));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_RANGE_CONFIRMATION — fastest poll, watching for a beam break
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_range_update(ctx: &mut DetectorContext) -> Option<Phase> {
    if !ctx.sensors.motion {
        // Motion ceased with no beam broken: not a crossing.
        return Some(Phase::AwaitingMotion);
    }
    range_decision(ctx)
}

/// Which confirmation phase a beam break selects.  Inner wins a same-tick
/// tie; keep that ordering, it is a deliberate asymmetry.
fn range_decision(ctx: &DetectorContext) -> Option<Phase> {
    if ctx.inner_below() {
        Some(Phase::ConfirmingEntrance)
    } else if ctx.outer_below() {
        Some(Phase::ConfirmingExit)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIRMING_ENTRANCE / CONFIRMING_EXIT — waiting for the second beam
// ═══════════════════════════════════════════════════════════════════════════

fn confirming_enter(ctx: &mut DetectorContext) {
    ctx.timer_ms = 0;
    info!("CONFIRMING: first beam broken, waiting for the second");
}

fn confirming_entrance_update(ctx: &mut DetectorContext) -> Option<Phase> {
    if ctx.outer_below() {
        let event = ctx.labelled_entrance();
        ctx.emit(event);
        info!("crossing confirmed: {:?}", event);
        return Some(Phase::CoolingDown);
    }
    confirm_timeout(ctx)
}

fn confirming_exit_update(ctx: &mut DetectorContext) -> Option<Phase> {
    if ctx.inner_below() {
        let event = ctx.labelled_exit();
        ctx.emit(event);
        info!("crossing confirmed: {:?}", event);
        return Some(Phase::CoolingDown);
    }
    confirm_timeout(ctx)
}

/// Advance the confirmation timer by one tick period; a window that elapses
/// without the second beam is abandoned silently.
fn confirm_timeout(ctx: &mut DetectorContext) -> Option<Phase> {
    ctx.timer_ms = ctx.timer_ms.saturating_add(ctx.config.confirm_period_ms);
    if ctx.timer_ms >= ctx.config.confirm_timeout_ms {
        info!("confirmation window elapsed, no crossing");
        return Some(Phase::CoolingDown);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING_DOWN — wait for both beams to clear before re-arming
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_down_update(ctx: &mut DetectorContext) -> Option<Phase> {
    if !ctx.inner_below() && !ctx.outer_below() {
        return Some(Phase::AwaitingMotion);
    }
    None
}
