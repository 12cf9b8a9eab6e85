//! WiFi station adapter.
//!
//! Implements [`NetworkPort`] — the hexagonal boundary for the WiFi link.
//! `join` is synchronous: it reconfigures the station, then polls the link
//! state every [`JOIN_POLL_INTERVAL`] until association or the deadline.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::EspWifi`.
//! - **all other targets**: a deterministic simulation with a configurable
//!   set of reachable networks, so rotation and boot flows run on the host.

use core::time::Duration;

use log::{info, warn};

use crate::app::ports::{NetworkError, NetworkPort};

#[cfg(target_os = "espidf")]
use crate::config::JOIN_POLL_INTERVAL;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

/// Pause after dropping an association before the radio is reused.
#[cfg(target_os = "espidf")]
const DISCONNECT_SETTLE: Duration = Duration::from_secs(1);

pub struct WifiStation {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    reachable: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    accept_any: bool,
    #[cfg(not(target_os = "espidf"))]
    associated: Option<String>,
    #[cfg(not(target_os = "espidf"))]
    joins: Vec<String>,
}

impl WifiStation {
    /// Bring up the station on the real radio.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, NetworkError> {
        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs)).map_err(|e| {
            warn!("WifiStation: driver init failed: {e}");
            NetworkError::Driver
        })?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(|_| NetworkError::Driver)?;
        wifi.start().map_err(|_| NetworkError::Driver)?;
        info!("WifiStation: station started");
        Ok(Self { wifi })
    }

    /// Simulated station where exactly the given SSIDs answer.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(reachable: &[&str]) -> Self {
        Self {
            reachable: reachable.iter().map(|s| (*s).to_owned()).collect(),
            accept_any: false,
            associated: None,
            joins: Vec::new(),
        }
    }

    /// Simulated station where every SSID answers.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated_any() -> Self {
        Self {
            reachable: Vec::new(),
            accept_any: true,
            associated: None,
            joins: Vec::new(),
        }
    }

    /// SSIDs passed to `join`, in order.
    #[cfg(not(target_os = "espidf"))]
    pub fn join_history(&self) -> &[String] {
        &self.joins
    }

    /// Remove `ssid` from the reachable set, as if the AP went away. An
    /// existing association survives until the next `disconnect`.
    #[cfg(not(target_os = "espidf"))]
    pub fn drop_network(&mut self, ssid: &str) {
        self.reachable.retain(|s| s != ssid);
    }
}

impl NetworkPort for WifiStation {
    fn is_connected(&self) -> bool {
        #[cfg(target_os = "espidf")]
        {
            matches!(self.wifi.is_up(), Ok(true))
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.associated.is_some()
        }
    }

    fn disconnect(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            let _ = self.wifi.disconnect();
            // Give the radio time to drop the association cleanly before
            // the next join reconfigures it.
            std::thread::sleep(DISCONNECT_SETTLE);
            info!("WifiStation: disconnected");
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.associated = None;
            info!("WifiStation(sim): disconnected");
        }
    }

    fn join(
        &mut self,
        ssid: &str,
        passphrase: &str,
        timeout: Duration,
    ) -> Result<(), NetworkError> {
        #[cfg(target_os = "espidf")]
        {
            let config = Configuration::Client(ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| NetworkError::Driver)?,
                password: passphrase.try_into().map_err(|_| NetworkError::Driver)?,
                auth_method: if passphrase.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            });
            self.wifi
                .set_configuration(&config)
                .map_err(|_| NetworkError::Driver)?;
            if !matches!(self.wifi.is_started(), Ok(true)) {
                self.wifi.start().map_err(|_| NetworkError::Driver)?;
            }
            self.wifi.connect().map_err(|_| NetworkError::Driver)?;

            let deadline = std::time::Instant::now() + timeout;
            while !matches!(self.wifi.is_up(), Ok(true)) {
                if std::time::Instant::now() >= deadline {
                    warn!(
                        "WifiStation: '{ssid}' did not answer within {}s",
                        timeout.as_secs()
                    );
                    let _ = self.wifi.disconnect();
                    return Err(NetworkError::JoinTimeout);
                }
                std::thread::sleep(JOIN_POLL_INTERVAL);
            }
            info!("WifiStation: joined '{ssid}'");
            Ok(())
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let _ = (passphrase, timeout);
            self.joins.push(ssid.to_owned());
            if self.accept_any || self.reachable.iter().any(|s| s == ssid) {
                self.associated = Some(ssid.to_owned());
                info!("WifiStation(sim): joined '{ssid}'");
                Ok(())
            } else {
                self.associated = None;
                warn!("WifiStation(sim): '{ssid}' unreachable");
                Err(NetworkError::JoinTimeout)
            }
        }
    }
}
