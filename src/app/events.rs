//! Outbound application events and feedback signals.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, publish over MQTT,
//! light an LED, play a jingle.

use crate::detector::context::CrossingEvent;
use crate::detector::Phase;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The detector produced a discrete event (door or crossing).
    Crossing(CrossingEvent),

    /// The detector transitioned between phases.
    PhaseChanged { from: Phase, to: Phase },

    /// Calibration finished with the given baselines and tolerance.
    CalibrationDone {
        baseline_inner_mm: u16,
        baseline_outer_mm: u16,
        tolerance_mm: u16,
    },

    /// The application service has started (carries initial phase).
    Started(Phase),
}

/// Abstract feedback signal rendered by the LED/speaker adapter.
/// Derived from the current phase, plus `Success` on a confirmed crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// Nothing in progress (door shut or merely armed).
    Idle,
    /// A crossing confirmation is in flight.
    Confirming,
    /// A crossing was just confirmed.
    Success,
}

impl Feedback {
    /// The steady-state signal for a phase.  `Success` is never steady
    /// state; it is emitted only on the tick a crossing confirms.
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::ConfirmingEntrance | Phase::ConfirmingExit => Self::Confirming,
            _ => Self::Idle,
        }
    }
}
