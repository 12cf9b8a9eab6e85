//! Device command engine
//!
//! Commands arrive embedded in heartbeat responses. Parsing is strict about
//! identity and per-type payload requirements; execution follows fixed
//! acknowledgment rules the cloud depends on:
//!
//! | command         | on success                   | on failure                                  |
//! |-----------------|------------------------------|---------------------------------------------|
//! | reset           | ack, then restart            | cannot fail                                 |
//! | wifi_update     | ack, then restart            | ack "WiFi connection failed, restored backup" |
//! | firmware_update | no ack, restart into new image | ack "OTA update failed"                   |
//! | unknown type    | never succeeds               | ack "Unknown command type"                  |
//!
//! A successful firmware update is deliberately unacknowledged: the cloud
//! confirms it from the version the next heartbeat reports.

use log::{info, warn};
use serde_json::Value;

use crate::app::ports::{HttpPort, NetworkPort, OtaPort, StoragePort};
use crate::cloud::SyncClient;
use crate::config::{Passphrase, Ssid};
use crate::rotation::{self, RotationOutcome};
use crate::store::ConfigStore;
use crate::update;

pub const TYPE_RESET: &str = "reset";
pub const TYPE_WIFI_UPDATE: &str = "wifi_update";
pub const TYPE_FIRMWARE_UPDATE: &str = "firmware_update";

/// Command ids are UUIDs on the wire.
pub type CommandId = heapless::String<36>;

/// A parsed, well-formed device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Plain acknowledged restart.
    Reset,
    /// Rotate to new WiFi credentials with rollback protection.
    WifiUpdate { ssid: Ssid, passphrase: Passphrase },
    /// Download and stage a new firmware image.
    FirmwareUpdate {
        url: heapless::String<255>,
        version: heapless::String<15>,
    },
    /// Recognized shape, unrecognized type. Always acknowledged as failed.
    Unknown(heapless::String<19>),
}

impl CommandKind {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Reset => TYPE_RESET,
            Self::WifiUpdate { .. } => TYPE_WIFI_UPDATE,
            Self::FirmwareUpdate { .. } => TYPE_FIRMWARE_UPDATE,
            Self::Unknown(raw) => raw.as_str(),
        }
    }
}

/// A command document that could not become a [`Command`]. When the id was
/// readable it is carried along so the failure can still be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRejection {
    pub id: Option<CommandId>,
    pub reason: &'static str,
}

impl ParseRejection {
    fn bare(reason: &'static str) -> Self {
        Self { id: None, reason }
    }

    fn with_id(id: CommandId, reason: &'static str) -> Self {
        Self { id: Some(id), reason }
    }
}

/// Parse the command object from a heartbeat response.
pub fn parse(value: &Value) -> Result<Command, ParseRejection> {
    let id_str = match value.get("id").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ParseRejection::bare("missing command id")),
    };
    let mut id = CommandId::new();
    if id.push_str(id_str).is_err() {
        return Err(ParseRejection::bare("command id too long"));
    }

    let type_str = match value.get("type").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ParseRejection::with_id(id, "missing command type")),
    };

    let payload = value.get("payload");
    let field = |key: &str| {
        payload
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let kind = match type_str {
        TYPE_RESET => CommandKind::Reset,

        TYPE_WIFI_UPDATE => {
            let Some(ssid_str) = field("ssid") else {
                return Err(ParseRejection::with_id(id, "wifi_update requires an ssid"));
            };
            let ssid = match Ssid::new(ssid_str) {
                Ok(s) => s,
                Err(_) => return Err(ParseRejection::with_id(id, "ssid too long")),
            };
            let passphrase = match field("password") {
                Some(p) => match Passphrase::new(p) {
                    Ok(p) => p,
                    Err(_) => return Err(ParseRejection::with_id(id, "passphrase too long")),
                },
                None => Passphrase::default(),
            };
            CommandKind::WifiUpdate { ssid, passphrase }
        }

        TYPE_FIRMWARE_UPDATE => {
            let Some(url_str) = field("url") else {
                return Err(ParseRejection::with_id(id, "firmware_update requires a url"));
            };
            let mut url = heapless::String::new();
            if url.push_str(url_str).is_err() {
                return Err(ParseRejection::with_id(id, "firmware url too long"));
            }
            let mut version = heapless::String::new();
            if version.push_str(field("version").unwrap_or_default()).is_err() {
                return Err(ParseRejection::with_id(id, "firmware version too long"));
            }
            CommandKind::FirmwareUpdate { url, version }
        }

        // Unrecognized types flow through to execution, which acknowledges
        // them as failed. Truncation is fine: the name is only logged.
        other => {
            let mut raw = heapless::String::new();
            for ch in other.chars() {
                if raw.push(ch).is_err() {
                    break;
                }
            }
            CommandKind::Unknown(raw)
        }
    };

    info!("parsed command {id}: {}", kind.type_name());
    Ok(Command { id, kind })
}

/// What the driver loop must do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Keep running the sync loop.
    Continue,
    /// Restart the device; acknowledgments have already been sent.
    RestartRequested,
    /// The network is unrecoverable without a restart.
    Fatal,
}

/// Execute a command and send the acknowledgment it calls for.
pub fn execute<S, H, N, O>(
    command: &Command,
    store: &mut ConfigStore<S>,
    http: &mut H,
    net: &mut N,
    ota: &mut O,
    sync: &SyncClient,
) -> ExecOutcome
where
    S: StoragePort,
    H: HttpPort,
    N: NetworkPort,
    O: OtaPort,
{
    let id = command.id.as_str();
    info!("executing command {id}: {}", command.kind.type_name());

    match &command.kind {
        CommandKind::Reset => {
            ack(sync, http, net, id, true, None);
            ExecOutcome::RestartRequested
        }

        CommandKind::WifiUpdate { ssid, passphrase } => {
            match rotation::rotate(store, net, ssid, passphrase) {
                RotationOutcome::Committed => {
                    // Delivered over the new network.
                    ack(sync, http, net, id, true, None);
                    ExecOutcome::RestartRequested
                }
                RotationOutcome::RolledBack => {
                    ack(sync, http, net, id, false, Some("WiFi connection failed, restored backup"));
                    ExecOutcome::Continue
                }
                // No link left to carry an acknowledgment.
                RotationOutcome::Fatal => ExecOutcome::Fatal,
            }
        }

        CommandKind::FirmwareUpdate { url, version } => {
            match update::perform(ota, url.as_str(), version.as_str()) {
                Ok(()) => ExecOutcome::RestartRequested,
                Err(_) => {
                    ack(sync, http, net, id, false, Some("OTA update failed"));
                    ExecOutcome::Continue
                }
            }
        }

        CommandKind::Unknown(raw) => {
            warn!("unknown command type '{raw}'");
            ack(sync, http, net, id, false, Some("Unknown command type"));
            ExecOutcome::Continue
        }
    }
}

fn ack<H: HttpPort, N: NetworkPort>(
    sync: &SyncClient,
    http: &mut H,
    net: &N,
    id: &str,
    success: bool,
    message: Option<&str>,
) {
    if let Err(e) = sync.acknowledge(http, net, id, success, message) {
        warn!("ack for command {id} not delivered: {e}");
    }
}
