//! Inbound application commands.
//!
//! Commands arrive from outside the domain core (serial console, MQTT
//! control topic) and are applied by
//! [`AppService::handle_command`](super::service::AppService::handle_command).

/// External commands the application service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Swap the entrance/exit labelling of emitted crossings.
    SetDirectionInversion(bool),
    /// Discard the current baselines and re-run the calibration burst.
    Recalibrate,
    /// Flush any unsaved settings to persistent storage now.
    SaveSettings,
}
