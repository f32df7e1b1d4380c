//! DoorSense Firmware — Main Entry Point
//!
//! Hexagonal architecture with a variable-period control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  HardwareAdapter     LogEventSink      NvsAdapter        │
//! │  (Sensor+Feedback)   (EventSink)       (Config+NVS)      │
//! │  MqttSink            WifiAdapter                         │
//! │  (EventSink+Link)    (STA bring-up)                      │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │            AppService (pure logic)             │      │
//! │  │  Detector phase machine · Calibration          │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod pins;

pub mod app;
pub mod detector;
mod adapters;
mod drivers;
mod sensors;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::hardware::HardwareAdapter;
use adapters::log_sink::LogEventSink;
use adapters::mqtt::MqttSink;
use adapters::nvs::NvsAdapter;
use adapters::wifi::WifiAdapter;
use app::events::AppEvent;
use app::ports::{ConfigPort, ConnectivityPort, EventSink};
use app::service::AppService;
use config::SystemConfig;
use drivers::speaker::Speaker;
use drivers::status_led::StatusLed;
use sensors::door::DoorContact;
use sensors::motion::MotionSensor;
use sensors::ranging::{Position, RangingSensor};
use sensors::SensorHub;

/// Fallback broker when no `mqtt_url` credential is provisioned.
const MQTT_BROKER_DEFAULT: &str = "mqtt://192.168.4.2:1883";
const MQTT_CLIENT_ID: &str = "doorsense";

// ── Sink stack ────────────────────────────────────────────────
//
// The service emits through a single sink; this stack fans events out
// to the serial log and the broker.  Link state comes from the MQTT
// side — the log never goes away, so it has no say in it.

struct SinkStack {
    log: LogEventSink,
    mqtt: MqttSink,
}

impl EventSink for SinkStack {
    fn emit(&mut self, event: &AppEvent) {
        self.log.emit(event);
        self.mqtt.emit(event);
    }
}

impl ConnectivityPort for SinkStack {
    fn link_available(&self) -> bool {
        self.mqtt.link_available()
    }
}

// ── Credential helpers ────────────────────────────────────────

fn read_credential_string(nvs: &NvsAdapter, key: &str) -> Option<String> {
    let mut buf = [0u8; 96];
    let len = nvs.read_credential(key, &mut buf).ok()?;
    core::str::from_utf8(&buf[..len]).ok().map(str::to_owned)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  DoorSense v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1b. Initialise hardware peripherals ───────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            // Continue without NVS — config will not be persisted this
            // session.  On next reboot, NVS should self-heal.
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. WiFi station bring-up ──────────────────────────────
    //
    // Entirely best-effort: the detector runs whether or not the link
    // comes up, and the MQTT client reconnects in the background.
    #[cfg(target_os = "espidf")]
    let mut wifi = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::hal::peripherals::Peripherals;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let partition = EspDefaultNvsPartition::take()?;
        match WifiAdapter::new(peripherals.modem, sysloop, partition) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!("WiFi driver init failed ({}), running offline", e);
                None
            }
        }
    };
    #[cfg(not(target_os = "espidf"))]
    let mut wifi = Some(WifiAdapter::new());

    if let Some(w) = wifi.as_mut() {
        let ssid = read_credential_string(&nvs, "wifi_ssid");
        let password = read_credential_string(&nvs, "wifi_pw").unwrap_or_default();
        match ssid {
            Some(ssid) => {
                if let Err(e) = w.set_credentials(&ssid, &password) {
                    warn!("stored WiFi credentials rejected: {}", e);
                } else {
                    // Failure arms the backoff timer; poll() retries below.
                    let _ = w.connect(0);
                }
            }
            None => warn!("no WiFi credentials provisioned, running offline"),
        }
    }

    // ── 4. MQTT sink ──────────────────────────────────────────
    let broker_url =
        read_credential_string(&nvs, "mqtt_url").unwrap_or_else(|| MQTT_BROKER_DEFAULT.to_owned());
    info!("MQTT broker: {}", broker_url);
    #[cfg(target_os = "espidf")]
    let mqtt = MqttSink::new(&broker_url, MQTT_CLIENT_ID)?;
    #[cfg(not(target_os = "espidf"))]
    let mqtt = MqttSink::new();

    let mut sinks = SinkStack {
        log: LogEventSink::new(),
        mqtt,
    };

    // ── 5. Construct the hardware adapter ─────────────────────
    let sensor_hub = SensorHub::new(
        RangingSensor::new(Position::Inner),
        RangingSensor::new(Position::Outer),
        DoorContact::new(),
        MotionSensor::new(),
    );
    let mut hw = HardwareAdapter::new(sensor_hub, StatusLed::new(), Speaker::new());
    hw.start_sensors();

    // ── 6. Construct app service ──────────────────────────────
    let mut app = AppService::new(config);
    app.start(&mut sinks);

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    //
    // The detector dictates the cadence: each tick returns the period
    // to sleep before the next one, so an idle doorway costs a 5 s
    // wake-up while an in-flight crossing is sampled every 20 ms.
    let mut uptime_ms: u32 = 0;

    loop {
        let period_ms = app.tick(&mut hw, &mut sinks);
        uptime_ms = uptime_ms.wrapping_add(period_ms);

        // WiFi link supervision (reconnect backoff).
        if let Some(w) = wifi.as_mut() {
            w.poll(uptime_ms);
        }

        // Config auto-save (5 s debounce after last change).
        app.auto_save_if_needed(&nvs);

        #[cfg(target_os = "espidf")]
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(period_ms);

        // Simulate the timer wake-up via sleep on non-espidf targets.
        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(period_ms)));
    }
}
