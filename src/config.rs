//! System configuration parameters
//!
//! All tunable parameters for the DoorSense crossing detector.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Calibration ---
    /// Number of ranging samples averaged into each baseline
    pub calibration_samples: u16,
    /// Readings beyond this distance (mm) are implausible and get clamped
    pub max_plausible_distance_mm: u16,
    /// Detection tolerance as a percentage of the mean baseline
    pub tolerance_percent: u8,

    // --- Detection ---
    /// How long a pending crossing may wait for its second beam (milliseconds)
    pub confirm_timeout_ms: u32,
    /// Emit Entrance where Exit would be emitted and vice versa
    pub invert_direction: bool,

    // --- Tick periods ---
    /// Tick period while calibrating or waiting for the door (milliseconds)
    pub idle_period_ms: u32,
    /// Tick period while armed and polling the PIR (milliseconds)
    pub armed_period_ms: u32,
    /// Tick period while watching for the first beam break (milliseconds)
    pub range_period_ms: u32,
    /// Tick period while confirming a crossing or cooling down (milliseconds)
    pub confirm_period_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Calibration
            calibration_samples: 20,
            max_plausible_distance_mm: 2000,
            tolerance_percent: 30,

            // Detection
            confirm_timeout_ms: 3000,
            invert_direction: false,

            // Tick periods
            idle_period_ms: 5000,  // door shut, nothing to do
            armed_period_ms: 200,  // PIR polling
            range_period_ms: 20,   // beam-break watch, fastest
            confirm_period_ms: 50, // second-beam confirmation
        }
    }
}
