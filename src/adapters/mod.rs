//! Adapters — concrete implementations of the port traits in
//! [`crate::app::ports`], one per external system (hardware, NVS,
//! serial log, MQTT, WiFi).

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod wifi;
