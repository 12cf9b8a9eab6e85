//! Sync service — the hexagonal core.
//!
//! [`SyncService`] owns the cloud client and the heartbeat/telemetry
//! cadence. All I/O flows through port traits injected at call sites,
//! making the entire service testable with mock adapters.
//!
//! ```text
//!  NetworkPort ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!     HttpPort ──▶ │       SyncService        │
//!   SensorPort ──▶ │  heartbeat · config ·    │ ──▶ ConfigStore
//!      OtaPort ──▶ │  commands · telemetry    │
//!                  └─────────────────────────┘
//! ```

use std::time::Instant;

use log::{error, info, warn};

use crate::cloud::{SyncClient, version_drift};
use crate::command::{self, ExecOutcome};
use crate::config::{HEARTBEAT_INTERVAL, JOIN_TIMEOUT, TELEMETRY_INTERVAL};
use crate::store::ConfigStore;

use super::events::AppEvent;
use super::ports::{EventSink, HttpPort, NetworkPort, OtaPort, SensorPort, StoragePort};

// ───────────────────────────────────────────────────────────────
// SyncService
// ───────────────────────────────────────────────────────────────

/// Drives the periodic exchanges with the cloud control plane.
pub struct SyncService {
    client: SyncClient,
    last_heartbeat: Option<Instant>,
    last_telemetry: Option<Instant>,
}

impl SyncService {
    pub fn new(client: SyncClient) -> Self {
        Self {
            client,
            last_heartbeat: None,
            last_telemetry: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the service; the first `tick` afterwards runs a heartbeat
    /// immediately.
    pub fn start<S: StoragePort>(&self, store: &ConfigStore<S>, sink: &mut impl EventSink) {
        let version = store.config().config_version;
        sink.emit(&AppEvent::Started {
            firmware_version: crate::config::FIRMWARE_VERSION,
            config_version: version,
        });
        info!(
            "sync service started ({} at config v{version})",
            crate::config::FIRMWARE_VERSION
        );
    }

    /// Join the stored network, falling back to the WiFi backup when the
    /// primary does not answer. Returns whether the device got online.
    pub fn boot_connect<S: StoragePort, N: NetworkPort>(
        &self,
        store: &mut ConfigStore<S>,
        net: &mut N,
        sink: &mut impl EventSink,
    ) -> bool {
        let ssid = store.config().wifi_ssid.clone();
        let passphrase = store.config().wifi_passphrase.clone();
        if ssid.is_empty() {
            warn!("no stored WiFi credentials, staying offline");
            return false;
        }

        info!("joining '{ssid}'");
        if net.join(ssid.as_str(), passphrase.as_str(), JOIN_TIMEOUT).is_ok() {
            sink.emit(&AppEvent::LinkUp { ssid });
            return true;
        }

        if !store.has_valid_backup() {
            error!("could not join '{ssid}' and no backup is stored");
            return false;
        }

        warn!("could not join '{ssid}', falling back to the WiFi backup");
        match store.restore_backup_wifi() {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => warn!("backup restore not persisted: {e}"),
        }
        let ssid = store.config().wifi_ssid.clone();
        let passphrase = store.config().wifi_passphrase.clone();
        info!("joining backup '{ssid}'");
        match net.join(ssid.as_str(), passphrase.as_str(), JOIN_TIMEOUT) {
            Ok(()) => {
                sink.emit(&AppEvent::LinkUp { ssid });
                true
            }
            Err(e) => {
                error!("backup join failed: {e}");
                false
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run whatever is due at `now`: a heartbeat every
    /// [`HEARTBEAT_INTERVAL`], telemetry every [`TELEMETRY_INTERVAL`].
    /// Both fire on the first tick after start.
    #[allow(clippy::too_many_arguments)]
    pub fn tick<S, H, N, O, P, E>(
        &mut self,
        now: Instant,
        store: &mut ConfigStore<S>,
        http: &mut H,
        net: &mut N,
        ota: &mut O,
        sensors: &mut P,
        sink: &mut E,
    ) -> ExecOutcome
    where
        S: StoragePort,
        H: HttpPort,
        N: NetworkPort,
        O: OtaPort,
        P: SensorPort,
        E: EventSink,
    {
        if due(self.last_heartbeat, now, HEARTBEAT_INTERVAL) {
            self.last_heartbeat = Some(now);
            let outcome = self.heartbeat_cycle(store, http, net, ota, sink);
            if outcome != ExecOutcome::Continue {
                return outcome;
            }
        }
        if due(self.last_telemetry, now, TELEMETRY_INTERVAL) {
            self.last_telemetry = Some(now);
            self.telemetry_cycle(store, http, net, sensors);
        }
        ExecOutcome::Continue
    }

    // ── Heartbeat ─────────────────────────────────────────────

    /// One heartbeat round: report liveness, chase config drift, run a
    /// pending command if the cloud sent one.
    pub fn heartbeat_cycle<S, H, N, O, E>(
        &self,
        store: &mut ConfigStore<S>,
        http: &mut H,
        net: &mut N,
        ota: &mut O,
        sink: &mut E,
    ) -> ExecOutcome
    where
        S: StoragePort,
        H: HttpPort,
        N: NetworkPort,
        O: OtaPort,
        E: EventSink,
    {
        let device_id = store.config().device_id.clone();
        let response = match self.client.send_heartbeat(http, net, device_id.as_str()) {
            Ok(r) => r,
            Err(e) => {
                warn!("heartbeat failed: {e}");
                return ExecOutcome::Continue;
            }
        };
        sink.emit(&AppEvent::Heartbeat {
            cloud_version: response.config_version,
        });

        if let Some(new_version) = version_drift(store.config().config_version, response.config_version)
        {
            info!(
                "config drift: local v{} cloud v{new_version}",
                store.config().config_version
            );
            match self.client.fetch_full_config(http, net, store) {
                Ok(slots) => {
                    store.config_mut().config_version = new_version;
                    if let Err(e) = store.save() {
                        error!("could not persist config version: {e}");
                    }
                    sink.emit(&AppEvent::ConfigApplied {
                        version: new_version,
                        slots,
                    });
                }
                // Version stays put, so the next heartbeat retries the fetch.
                Err(e) => warn!("config fetch failed: {e}"),
            }
        }

        if let Some(raw) = response.command {
            return self.run_command(&raw, store, http, net, ota, sink);
        }
        ExecOutcome::Continue
    }

    fn run_command<S, H, N, O, E>(
        &self,
        raw: &serde_json::Value,
        store: &mut ConfigStore<S>,
        http: &mut H,
        net: &mut N,
        ota: &mut O,
        sink: &mut E,
    ) -> ExecOutcome
    where
        S: StoragePort,
        H: HttpPort,
        N: NetworkPort,
        O: OtaPort,
        E: EventSink,
    {
        let cmd = match command::parse(raw) {
            Ok(cmd) => cmd,
            Err(rejection) => {
                warn!("rejected command: {}", rejection.reason);
                if let Some(id) = rejection.id {
                    if let Err(e) =
                        self.client
                            .acknowledge(http, net, id.as_str(), false, Some(rejection.reason))
                    {
                        warn!("ack for rejected command {id} not delivered: {e}");
                    }
                }
                return ExecOutcome::Continue;
            }
        };
        let outcome = command::execute(&cmd, store, http, net, ota, &self.client);
        sink.emit(&AppEvent::CommandExecuted {
            id: cmd.id.clone(),
            outcome,
        });
        outcome
    }

    // ── Telemetry ─────────────────────────────────────────────

    /// Sample the configured slots and post readings. Failures are logged
    /// and retried at the next interval; telemetry never stops the loop.
    pub fn telemetry_cycle<S, H, N, P>(
        &self,
        store: &ConfigStore<S>,
        http: &mut H,
        net: &N,
        sensors: &mut P,
    ) where
        S: StoragePort,
        H: HttpPort,
        N: NetworkPort,
        P: SensorPort,
    {
        match self
            .client
            .publish_readings(http, net, store.config(), sensors)
        {
            Ok(0) => {}
            Ok(n) => info!("telemetry: {n} reading(s) posted"),
            Err(e) => warn!("telemetry failed: {e}"),
        }
    }
}

fn due(last: Option<Instant>, now: Instant, interval: core::time::Duration) -> bool {
    match last {
        None => true,
        Some(t) => now.saturating_duration_since(t) >= interval,
    }
}
