//! Cloud control-plane client
//!
//! One blocking HTTP exchange per operation: heartbeat, full config fetch,
//! command acknowledgment, telemetry. Every operation checks the network
//! port first and refuses to touch the wire while offline. Transport and
//! parse failures never mutate device state; the persisted configuration
//! only changes after a complete response has been decoded.

pub mod protocol;

use log::{debug, info, warn};

use crate::app::ports::{
    HttpError, HttpPort, NetworkPort, SensorPort, StorageError, StoragePort,
};
use crate::config::{DeviceConfig, FIRMWARE_VERSION, SensorSlot};
use crate::mapper;
use crate::store::ConfigStore;

pub use protocol::HeartbeatResponse;

pub const HEARTBEAT_PATH: &str = "/rest/v1/rpc/device_heartbeat_with_config_v2";
pub const SENSOR_CONFIG_PATH: &str = "/rest/v1/rpc/get_device_sensor_config";
pub const ACK_PATH: &str = "/rest/v1/rpc/acknowledge_device_command";
pub const READINGS_PATH: &str = "/rest/v1/rpc/insert_sensor_readings";

/// Sync operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// No network association; nothing was sent.
    Offline,
    /// Transport-level failure.
    Http(HttpError),
    /// The control plane answered with a non-success status.
    Status(u16),
    /// The response body did not decode.
    Malformed,
    /// A fetched configuration could not be persisted.
    Storage(StorageError),
}

impl core::fmt::Display for SyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Malformed => write!(f, "malformed response"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<HttpError> for SyncError {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Returns the cloud version to fetch when it differs from the local one.
///
/// `None` from the heartbeat means the cloud did not state a version, which
/// never triggers a fetch.
pub fn version_drift(local: i32, cloud: Option<i32>) -> Option<i32> {
    match cloud {
        Some(v) if v != local => Some(v),
        _ => None,
    }
}

/// Client for the cloud REST endpoints.
///
/// Holds endpoint URLs and credentials only; HTTP, network and storage come
/// in through ports per call, so one client instance serves both the sync
/// loop and the command engine.
pub struct SyncClient {
    api_key: String,
    bearer: String,
    heartbeat_url: String,
    sensor_config_url: String,
    ack_url: String,
    readings_url: String,
}

impl SyncClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_key: api_key.to_owned(),
            bearer: format!("Bearer {api_key}"),
            heartbeat_url: format!("{base}{HEARTBEAT_PATH}"),
            sensor_config_url: format!("{base}{SENSOR_CONFIG_PATH}"),
            ack_url: format!("{base}{ACK_PATH}"),
            readings_url: format!("{base}{READINGS_PATH}"),
        }
    }

    fn auth_headers(&self) -> [(&str, &str); 3] {
        [
            ("Content-Type", "application/json"),
            ("apikey", &self.api_key),
            ("Authorization", &self.bearer),
        ]
    }

    /// Report liveness and the running firmware version; the response may
    /// carry the cloud-side config version and a pending command.
    pub fn send_heartbeat<H: HttpPort, N: NetworkPort>(
        &self,
        http: &mut H,
        net: &N,
        device_id: &str,
    ) -> Result<HeartbeatResponse, SyncError> {
        if !net.is_connected() {
            return Err(SyncError::Offline);
        }
        let body = protocol::heartbeat_body(device_id, FIRMWARE_VERSION);
        let response = http.post(&self.heartbeat_url, &self.auth_headers(), body.as_bytes())?;
        if !response.is_success() {
            warn!("heartbeat rejected with status {}", response.status);
            return Err(SyncError::Status(response.status));
        }
        let parsed = protocol::parse_heartbeat(&response.body).map_err(|e| {
            warn!("heartbeat response did not parse: {e}");
            SyncError::Malformed
        })?;
        debug!(
            "heartbeat ok: success={} cloud_version={:?} command={}",
            parsed.success,
            parsed.config_version,
            parsed.command.is_some()
        );
        Ok(parsed)
    }

    /// Fetch the complete sensor configuration and apply it to the store.
    ///
    /// The response is parsed in full before any slot changes, so a
    /// half-readable document cannot leave a partially applied table.
    /// Returns the number of slots applied. The caller records the new
    /// config version once this returns `Ok`.
    pub fn fetch_full_config<H: HttpPort, N: NetworkPort, S: StoragePort>(
        &self,
        http: &mut H,
        net: &N,
        store: &mut ConfigStore<S>,
    ) -> Result<usize, SyncError> {
        if !net.is_connected() {
            return Err(SyncError::Offline);
        }
        let body = protocol::config_fetch_body(store.config().device_id.as_str());
        let response = http.post(&self.sensor_config_url, &self.auth_headers(), body.as_bytes())?;
        if !response.is_success() {
            warn!("config fetch rejected with status {}", response.status);
            return Err(SyncError::Status(response.status));
        }
        let entries = protocol::parse_sensor_rows(&response.body).map_err(|e| {
            warn!("config response did not parse: {e}");
            SyncError::Malformed
        })?;
        let applied = mapper::apply_cloud_config(&mut store.config_mut().sensors, &entries);
        store.save()?;
        info!("applied cloud sensor config: {applied} slot(s)");
        Ok(applied)
    }

    /// Report the outcome of a command back to the cloud. `error_message`
    /// travels only when the command failed with one.
    pub fn acknowledge<H: HttpPort, N: NetworkPort>(
        &self,
        http: &mut H,
        net: &N,
        command_id: &str,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), SyncError> {
        if !net.is_connected() {
            debug!("offline, dropping ack for command {command_id}");
            return Err(SyncError::Offline);
        }
        let body = protocol::ack_body(command_id, success, error_message);
        let response = http.post(&self.ack_url, &self.auth_headers(), body.as_bytes())?;
        if !response.is_success() {
            return Err(SyncError::Status(response.status));
        }
        debug!("acknowledged command {command_id} success={success}");
        Ok(())
    }

    /// Sample every configured slot and post the readings. An empty sample
    /// set is a successful no-op. Telemetry additionally authenticates with
    /// the per-device key.
    pub fn publish_readings<H: HttpPort, N: NetworkPort, P: SensorPort>(
        &self,
        http: &mut H,
        net: &N,
        config: &DeviceConfig,
        sensors: &mut P,
    ) -> Result<usize, SyncError> {
        if !net.is_connected() {
            return Err(SyncError::Offline);
        }
        let mut readings = Vec::new();
        for (index, slot) in config.sensors.iter().enumerate() {
            if !slot.is_configured() {
                continue;
            }
            for m in sensors.sample(slot) {
                readings.push(protocol::Reading {
                    composite_device_id: config.device_id.as_str().to_owned(),
                    sensor_type: m.channel.sensor_type().to_owned(),
                    sensor_name: format!("{}{}", display_name(slot, index), m.channel.name_suffix()),
                    port_id: format!("GPIO{}", slot.pin),
                    value: m.value,
                    unit: m.channel.unit().to_owned(),
                });
            }
        }
        if readings.is_empty() {
            debug!("no measurements this cycle");
            return Ok(0);
        }
        let headers = [
            ("Content-Type", "application/json"),
            ("apikey", self.api_key.as_str()),
            ("x-device-key", config.device_key.as_str()),
        ];
        let body = protocol::readings_body(&readings);
        let response = http.post(&self.readings_url, &headers, body.as_bytes())?;
        if !response.is_success() {
            warn!("readings rejected with status {}", response.status);
            return Err(SyncError::Status(response.status));
        }
        info!("posted {} reading(s)", readings.len());
        Ok(readings.len())
    }
}

fn display_name(slot: &SensorSlot, index: usize) -> String {
    if slot.name.is_empty() {
        format!("Sensor {}", index + 1)
    } else {
        slot.name.as_str().to_owned()
    }
}
