//! WiFi station-mode adapter.
//!
//! Brings the network link up for the MQTT publisher.  Crossing
//! detection never waits on this adapter: with WiFi down the detector
//! keeps running and events are recorded on serial only.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: owns a [`BlockingWifi`]-wrapped
//!   [`EspWifi`] driver and performs real STA connections.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying from `poll()`.

use log::{info, warn};

use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

// ───────────────────────────────────────────────────────────────
// Credential validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

// Empty password means an open network; WPA2 requires 8-64 bytes.
fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: u32,
    next_retry_at_ms: u32,

    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,

    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: bool,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    /// Take ownership of the modem peripheral and wrap the STA driver.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> anyhow::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        let wifi = BlockingWifi::wrap(wifi, sysloop)?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            next_retry_at_ms: 0,
            wifi,
        })
    }

    fn platform_connect(&mut self) -> Result<(), CommsError> {
        let client = ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|()| CommsError::InvalidCredentials)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|()| CommsError::InvalidCredentials)?,
            auth_method: if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };

        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| CommsError::WifiConnectFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi
                .start()
                .map_err(|_| CommsError::WifiConnectFailed)?;
        }
        self.wifi
            .connect()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        Ok(())
    }

    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            next_retry_at_ms: 0,
            sim_link_up: false,
            sim_fail_next: false,
        }
    }

    /// Make the next `platform_connect` attempt fail.
    pub fn sim_fail_next_connect(&mut self) {
        self.sim_fail_next = true;
    }

    /// Drop the link out from under the adapter, as an AP reboot would.
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    fn platform_connect(&mut self) -> Result<(), CommsError> {
        if self.sim_fail_next {
            self.sim_fail_next = false;
            return Err(CommsError::WifiConnectFailed);
        }
        self.sim_link_up = true;
        Ok(())
    }

    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }
}

impl WifiAdapter {
    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    /// Validate and store STA credentials.  Does not connect.
    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.password.clear();
        // Lengths were just validated against the buffer capacities.
        let _ = self.ssid.push_str(ssid);
        let _ = self.password.push_str(password);
        Ok(())
    }

    /// Attempt a blocking STA connection.  On failure the adapter arms
    /// the backoff timer and `poll()` retries.
    pub fn connect(&mut self, now_ms: u32) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            return Err(CommsError::InvalidCredentials);
        }
        self.state = WifiState::Connecting;
        match self.platform_connect() {
            Ok(()) => {
                info!("WiFi connected to '{}'", self.ssid);
                self.state = WifiState::Connected;
                self.backoff_ms = INITIAL_BACKOFF_MS;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "WiFi connect to '{}' failed ({e}), retrying in {} ms",
                    self.ssid, self.backoff_ms
                );
                self.state = WifiState::Reconnecting { attempt: 1 };
                self.next_retry_at_ms = now_ms.wrapping_add(self.backoff_ms);
                Err(e)
            }
        }
    }

    /// Drive link supervision: detect a lost link and retry with
    /// exponential backoff.  Called once per control tick.
    pub fn poll(&mut self, now_ms: u32) {
        match self.state {
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi link lost, retrying in {} ms", self.backoff_ms);
                    self.state = WifiState::Reconnecting { attempt: 1 };
                    self.next_retry_at_ms = now_ms.wrapping_add(self.backoff_ms);
                }
            }
            WifiState::Reconnecting { attempt } => {
                // Wrap-safe "now >= next_retry_at" check.
                if now_ms.wrapping_sub(self.next_retry_at_ms) < u32::MAX / 2 {
                    match self.platform_connect() {
                        Ok(()) => {
                            info!("WiFi reconnected (attempt {attempt})");
                            self.state = WifiState::Connected;
                            self.backoff_ms = INITIAL_BACKOFF_MS;
                        }
                        Err(e) => {
                            self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
                            warn!(
                                "WiFi reconnect attempt {attempt} failed ({e}), next in {} ms",
                                self.backoff_ms
                            );
                            self.state = WifiState::Reconnecting { attempt: attempt + 1 };
                            self.next_retry_at_ms = now_ms.wrapping_add(self.backoff_ms);
                        }
                    }
                }
            }
            WifiState::Disconnected | WifiState::Connecting => {}
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_credentials() {
        let mut wifi = WifiAdapter::new();
        assert_eq!(
            wifi.set_credentials("", "password123"),
            Err(CommsError::InvalidCredentials)
        );
        assert_eq!(
            wifi.set_credentials("home", "short"),
            Err(CommsError::InvalidCredentials)
        );
        assert_eq!(
            wifi.set_credentials("this-ssid-is-well-over-thirty-two-bytes", "password123"),
            Err(CommsError::InvalidCredentials)
        );
        // Open network: empty password is allowed.
        assert_eq!(wifi.set_credentials("cafe-guest", ""), Ok(()));
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut wifi = WifiAdapter::new();
        assert_eq!(wifi.connect(0), Err(CommsError::InvalidCredentials));
        assert_eq!(wifi.state(), WifiState::Disconnected);
    }

    #[test]
    fn successful_connect_reports_link() {
        let mut wifi = WifiAdapter::new();
        wifi.set_credentials("home", "password123").unwrap();
        assert_eq!(wifi.connect(0), Ok(()));
        assert!(wifi.is_connected());
    }

    #[test]
    fn failed_connect_retries_with_doubling_backoff() {
        let mut wifi = WifiAdapter::new();
        wifi.set_credentials("home", "password123").unwrap();

        wifi.sim_fail_next_connect();
        assert!(wifi.connect(0).is_err());
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 1 });

        // Not due yet at 1 s.
        wifi.sim_fail_next_connect();
        wifi.poll(1_000);
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 1 });

        // Due at 2 s: attempt fails, backoff doubles to 4 s.
        wifi.poll(2_000);
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 2 });

        // Next attempt at 6 s succeeds.
        wifi.poll(6_000);
        assert_eq!(wifi.state(), WifiState::Connected);
        assert!(wifi.is_connected());
    }

    #[test]
    fn lost_link_triggers_reconnect_cycle() {
        let mut wifi = WifiAdapter::new();
        wifi.set_credentials("home", "password123").unwrap();
        wifi.connect(0).unwrap();

        wifi.sim_drop_link();
        wifi.poll(10_000);
        assert_eq!(wifi.state(), WifiState::Reconnecting { attempt: 1 });

        wifi.poll(12_000);
        assert_eq!(wifi.state(), WifiState::Connected);
    }

    #[test]
    fn backoff_caps_at_one_minute() {
        let mut wifi = WifiAdapter::new();
        wifi.set_credentials("home", "password123").unwrap();
        wifi.sim_fail_next_connect();
        let _ = wifi.connect(0);

        let mut now = 0u32;
        for _ in 0..10 {
            now = now.wrapping_add(120_000);
            wifi.sim_fail_next_connect();
            wifi.poll(now);
        }
        assert_eq!(wifi.backoff_ms, MAX_BACKOFF_MS);
    }
}
