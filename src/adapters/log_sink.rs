//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The MQTT adapter implements the same trait for the network side.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Crossing(ev) => {
                info!("EVENT | {:?}", ev);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {:?} -> {:?}", from, to);
            }
            AppEvent::CalibrationDone {
                baseline_inner_mm,
                baseline_outer_mm,
                tolerance_mm,
            } => {
                info!(
                    "CALIB | inner={}mm outer={}mm tolerance={}mm",
                    baseline_inner_mm, baseline_outer_mm, tolerance_mm
                );
            }
            AppEvent::Started(phase) => {
                info!("START | initial_phase={:?}", phase);
            }
        }
    }
}
