//! Shared mutable context threaded through every phase handler.
//!
//! `DetectorContext` is the single struct that phase handlers read from and
//! write to.  It contains the latest sensor snapshot, the calibration result,
//! the events emitted during the current tick, timing information, and
//! configuration.  Think of it as the "blackboard" in a blackboard
//! architecture.

use heapless::Vec;

use crate::config::SystemConfig;
use crate::detector::calibration::{Calibration, Calibrator};

// ---------------------------------------------------------------------------
// Sensor snapshot (read-only to phase handlers; written by the sensor hub)
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of every sensor in the system.
///
/// Ranging distances are `None` when the sensor could not produce a reading
/// this tick; handlers treat that as "far" (no detection).
#[derive(Debug, Clone, Copy)]
pub struct SensorSnapshot {
    /// Inner ranging distance in millimeters, toward the interior.
    pub inner_mm: Option<u16>,
    /// Outer ranging distance in millimeters, toward the exterior.
    pub outer_mm: Option<u16>,
    /// Door contact: `true` = door closed.
    pub door_closed: bool,
    /// PIR motion: `true` = gross motion in front of the doorway.
    pub motion: bool,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            inner_mm: None,
            outer_mm: None,
            door_closed: true,
            motion: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Emitted events
// ---------------------------------------------------------------------------

/// Discrete events produced by the detector, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingEvent {
    /// The door contact opened.
    DoorOpened,
    /// The door contact closed.
    DoorClosed,
    /// A person crossed inward (occupancy increased).
    Entrance,
    /// A person crossed outward (occupancy decreased).
    Exit,
}

/// Upper bound on events a single tick can emit.  A tick emits at most one
/// door event or one crossing event; 4 leaves headroom.
pub const MAX_EVENTS_PER_TICK: usize = 4;

// ---------------------------------------------------------------------------
// DetectorContext
// ---------------------------------------------------------------------------

/// The shared context passed to every phase handler function.
pub struct DetectorContext {
    // -- Timing --
    /// Milliseconds accumulated in the current confirmation window.
    /// Reset on entry to a confirming phase, advanced by the tick period.
    pub timer_ms: u32,

    // -- Sensor data --
    /// Latest sensor readings.  Updated before each detector tick.
    pub sensors: SensorSnapshot,

    // -- Calibration --
    /// In-progress calibration burst accumulator.
    pub calibrator: Calibrator,
    /// Baselines and tolerance.  All-zero until the burst completes, which
    /// keeps every threshold comparison false (nothing detected).
    pub calibration: Calibration,

    // -- Outputs --
    /// Events emitted during the current tick, cleared by the engine before
    /// each handler dispatch.
    pub events: Vec<CrossingEvent, MAX_EVENTS_PER_TICK>,

    // -- Configuration --
    /// System configuration (tunable parameters).
    pub config: SystemConfig,
}

impl DetectorContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            timer_ms: 0,
            sensors: SensorSnapshot::default(),
            calibrator: Calibrator::new(&config),
            calibration: Calibration::default(),
            events: Vec::new(),
            config,
        }
    }

    /// Record an event for this tick.  The capacity bound holds by
    /// construction (one door event or one crossing per tick).
    pub fn emit(&mut self, event: CrossingEvent) {
        let _ = self.events.push(event);
    }

    /// Flip the entrance/exit labelling.  Takes effect at the next emission;
    /// the phase machine itself is direction-agnostic.
    pub fn set_direction_inversion(&mut self, invert: bool) {
        self.config.invert_direction = invert;
    }

    /// The event token for a physical inward crossing, with the inversion
    /// flag applied at the point of emission.
    pub fn labelled_entrance(&self) -> CrossingEvent {
        if self.config.invert_direction {
            CrossingEvent::Exit
        } else {
            CrossingEvent::Entrance
        }
    }

    /// The event token for a physical outward crossing.
    pub fn labelled_exit(&self) -> CrossingEvent {
        if self.config.invert_direction {
            CrossingEvent::Entrance
        } else {
            CrossingEvent::Exit
        }
    }

    /// True if the inner reading is below its detection threshold.
    /// An unavailable reading is "far" and never below.
    pub fn inner_below(&self) -> bool {
        self.calibration.below_inner(self.sensors.inner_mm)
    }

    /// True if the outer reading is below its detection threshold.
    pub fn outer_below(&self) -> bool {
        self.calibration.below_outer(self.sensors.outer_mm)
    }
}
