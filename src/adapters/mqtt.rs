//! MQTT event sink adapter.
//!
//! Publishes door and crossing events to the broker:
//!
//! | topic                | payload | meaning                  |
//! |----------------------|---------|--------------------------|
//! | `doorsense/door`     | `"1"`   | door opened              |
//! | `doorsense/door`     | `"0"`   | door closed              |
//! | `doorsense/crossing` | `"1"`   | entrance (occupancy up)  |
//! | `doorsense/crossing` | `"0"`   | exit (occupancy down)    |
//! | `doorsense/status`   | JSON    | calibration results      |
//!
//! Phase changes stay on the serial log; only discrete events and the
//! calibration summary leave the device.  Nothing is queued: an event
//! raised while the broker is unreachable is dropped by the service layer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: a real [`EspMqttClient`] with a connection-state callback.
//! On host/test: records published (topic, payload) pairs in memory.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ConnectivityPort, EventSink};
use crate::detector::context::CrossingEvent;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
#[cfg(target_os = "espidf")]
use std::sync::Arc;

/// Door open/close announcements.
pub const TOPIC_DOOR: &str = "doorsense/door";
/// Confirmed crossings.
pub const TOPIC_CROSSING: &str = "doorsense/crossing";
/// Calibration results, as a JSON blob.
pub const TOPIC_STATUS: &str = "doorsense/status";

pub struct MqttSink {
    #[cfg(target_os = "espidf")]
    client: EspMqttClient<'static>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,

    #[cfg(not(target_os = "espidf"))]
    connected: bool,
    #[cfg(not(target_os = "espidf"))]
    published: Vec<(String, String)>,
}

#[cfg(target_os = "espidf")]
impl MqttSink {
    /// Connect to the broker.  The connection callback keeps a shared flag
    /// current so [`ConnectivityPort::link_available`] is a cheap load.
    pub fn new(broker_url: &str, client_id: &str) -> anyhow::Result<Self> {
        let connected = Arc::new(AtomicBool::new(false));
        let connected_cb = Arc::clone(&connected);

        let client = EspMqttClient::new(
            broker_url,
            &MqttClientConfiguration {
                client_id: Some(client_id),
                ..Default::default()
            },
            move |event| match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT connected");
                    connected_cb.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => {
                    warn!("MQTT disconnected");
                    connected_cb.store(false, Ordering::Release);
                }
                _ => {}
            },
        )?;

        Ok(Self { client, connected })
    }

    fn publish(&mut self, topic: &str, payload: &str) {
        if let Err(e) = self
            .client
            .enqueue(topic, QoS::AtLeastOnce, false, payload.as_bytes())
        {
            warn!("MQTT publish to {topic} failed: {e}");
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttSink {
    pub fn new() -> Self {
        Self {
            connected: true,
            published: Vec::new(),
        }
    }

    pub fn sim_set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> &[(String, String)] {
        &self.published
    }

    fn publish(&mut self, topic: &str, payload: &str) {
        info!("MQTT(sim) publish {topic} = {payload}");
        self.published.push((topic.to_string(), payload.to_string()));
    }
}

impl EventSink for MqttSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Crossing(CrossingEvent::DoorOpened) => self.publish(TOPIC_DOOR, "1"),
            AppEvent::Crossing(CrossingEvent::DoorClosed) => self.publish(TOPIC_DOOR, "0"),
            AppEvent::Crossing(CrossingEvent::Entrance) => self.publish(TOPIC_CROSSING, "1"),
            AppEvent::Crossing(CrossingEvent::Exit) => self.publish(TOPIC_CROSSING, "0"),
            AppEvent::CalibrationDone {
                baseline_inner_mm,
                baseline_outer_mm,
                tolerance_mm,
            } => {
                let payload = serde_json::json!({
                    "baseline_inner_mm": baseline_inner_mm,
                    "baseline_outer_mm": baseline_outer_mm,
                    "tolerance_mm": tolerance_mm,
                })
                .to_string();
                self.publish(TOPIC_STATUS, &payload);
            }
            // Phase changes stay local.
            _ => {}
        }
    }
}

impl ConnectivityPort for MqttSink {
    #[cfg(target_os = "espidf")]
    fn link_available(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_available(&self) -> bool {
        self.connected
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::detector::Phase;

    #[test]
    fn maps_events_to_topics() {
        let mut sink = MqttSink::new();
        sink.emit(&AppEvent::Crossing(CrossingEvent::DoorOpened));
        sink.emit(&AppEvent::Crossing(CrossingEvent::Entrance));
        sink.emit(&AppEvent::Crossing(CrossingEvent::Exit));
        sink.emit(&AppEvent::Crossing(CrossingEvent::DoorClosed));

        let expected = [
            (TOPIC_DOOR, "1"),
            (TOPIC_CROSSING, "1"),
            (TOPIC_CROSSING, "0"),
            (TOPIC_DOOR, "0"),
        ];
        let got: Vec<(&str, &str)> = sink
            .published()
            .iter()
            .map(|(t, p)| (t.as_str(), p.as_str()))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn phase_changes_are_not_published() {
        let mut sink = MqttSink::new();
        sink.emit(&AppEvent::PhaseChanged {
            from: Phase::Idle,
            to: Phase::AwaitingMotion,
        });
        sink.emit(&AppEvent::Started(Phase::Calibrating));
        assert!(sink.published().is_empty());
    }

    #[test]
    fn calibration_results_publish_as_json() {
        let mut sink = MqttSink::new();
        sink.emit(&AppEvent::CalibrationDone {
            baseline_inner_mm: 1000,
            baseline_outer_mm: 950,
            tolerance_mm: 292,
        });
        let (topic, payload) = &sink.published()[0];
        assert_eq!(topic, TOPIC_STATUS);
        let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed["baseline_inner_mm"], 1000);
        assert_eq!(parsed["tolerance_mm"], 292);
    }
}
