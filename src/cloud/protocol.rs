//! Control-plane wire shapes
//!
//! JSON bodies and response types for the cloud RPC endpoints. Field names
//! here are wire contracts shared with the control plane and must not be
//! renamed. Request builders are infallible; response parsers are lenient
//! about optional fields but reject documents that are not shaped at all.

use serde::Deserialize;
use serde_json::json;

/// One reading posted by telemetry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Reading {
    pub composite_device_id: String,
    pub sensor_type: String,
    pub sensor_name: String,
    pub port_id: String,
    pub value: f32,
    pub unit: String,
}

/// Heartbeat response. `config_version` stays `None` when the field is
/// absent, so an unknown cloud version is never conflated with version 0
/// or a sentinel.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub config_version: Option<i32>,
    /// Raw pending-command object; the command engine parses it.
    #[serde(default)]
    pub command: Option<serde_json::Value>,
}

/// One complete row of the fetched sensor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfigEntry {
    pub sensor_type: String,
    pub port_id: String,
}

#[derive(Debug, Deserialize)]
struct SensorRow {
    sensor_type: Option<String>,
    port_id: Option<String>,
}

pub fn heartbeat_body(device_id: &str, firmware_version: &str) -> String {
    json!({
        "composite_device_id_param": device_id,
        "firmware_version_param": firmware_version,
    })
    .to_string()
}

pub fn config_fetch_body(device_id: &str) -> String {
    json!({ "composite_device_id_param": device_id }).to_string()
}

/// Ack body; the error message field is only present on failures that
/// carry one.
pub fn ack_body(command_id: &str, success: bool, error_message: Option<&str>) -> String {
    let mut body = json!({
        "command_id_param": command_id,
        "success_param": success,
    });
    if let Some(message) = error_message {
        body["error_message_param"] = json!(message);
    }
    body.to_string()
}

pub fn readings_body(readings: &[Reading]) -> String {
    json!({ "readings": readings }).to_string()
}

pub fn parse_heartbeat(body: &[u8]) -> Result<HeartbeatResponse, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Parse the config-fetch response array. Rows missing either field are
/// dropped, matching how the sync cycle treats half-described sensors.
pub fn parse_sensor_rows(body: &[u8]) -> Result<Vec<SensorConfigEntry>, serde_json::Error> {
    let rows: Vec<SensorRow> = serde_json::from_slice(body)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match (row.sensor_type, row.port_id) {
            (Some(sensor_type), Some(port_id)) => Some(SensorConfigEntry { sensor_type, port_id }),
            _ => None,
        })
        .collect())
}
