//! Rollback-safe WiFi credential rotation
//!
//! Drives a `wifi_update` command through an explicit state machine:
//!
//! ```text
//!   ┌────────┐      ┌────────────┐ join ok ┌───────────┐
//!   │ Backup │ ───▶ │ AttemptNew │ ──────▶ │ Committed │
//!   └────────┘      └─────┬──────┘         └───────────┘
//!                         │ join timeout
//!                  ┌──────▼────────┐ rejoin ┌─────────────┐
//!                  │ RestoreBackup │ ─────▶ │ Reconnected │
//!                  └──────┬────────┘   ok   └─────────────┘
//!                         │ rejoin failed
//!                     ┌───▼───┐
//!                     │ Fatal │
//!                     └───────┘
//! ```
//!
//! Credentials are persisted before each join so a power loss mid-rotation
//! boots into a known record. `Fatal` is an outcome, not a reboot: the
//! top-level driver decides what a dead link means, which keeps the whole
//! engine runnable under the simulation adapters.

use core::fmt;

use log::{error, info, warn};

use crate::app::ports::{NetworkPort, StoragePort};
use crate::config::{JOIN_TIMEOUT, Passphrase, Ssid};
use crate::store::ConfigStore;

/// States of one rotation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// Persist the current credentials into the backup slot.
    Backup,
    /// Persist the new credentials as primary and join the new network.
    AttemptNew,
    /// New network verified; new credentials stay primary.
    Committed,
    /// Join timed out; restore the backup and rejoin the old network.
    RestoreBackup,
    /// Rollback landed; the device is back on the old network.
    Reconnected,
    /// Rollback join failed too; the link is gone.
    Fatal,
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Backup => "Backup",
            Self::AttemptNew => "AttemptNew",
            Self::Committed => "Committed",
            Self::RestoreBackup => "RestoreBackup",
            Self::Reconnected => "Reconnected",
            Self::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

/// How a rotation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// New credentials verified and persisted as primary. The backup stays
    /// valid in case the operator wants to revert later.
    Committed,
    /// New network unreachable; old credentials restored and rejoined.
    RolledBack,
    /// Neither network reachable. The only recovery is a restart and a
    /// fresh boot-time connection sequence; the caller owns that decision.
    Fatal,
}

/// Run one rotation to `new_ssid`/`new_passphrase`.
pub fn rotate<S: StoragePort, N: NetworkPort>(
    store: &mut ConfigStore<S>,
    net: &mut N,
    new_ssid: &Ssid,
    new_passphrase: &Passphrase,
) -> RotationOutcome {
    info!("rotating WiFi credentials to '{new_ssid}'");
    let mut state = RotationState::Backup;
    loop {
        let next = match state {
            RotationState::Backup => {
                if let Err(e) = store.backup_current_wifi() {
                    // Nothing touched yet: the device keeps its old link.
                    error!("rotation aborted, backup failed: {e}");
                    return RotationOutcome::RolledBack;
                }
                RotationState::AttemptNew
            }

            RotationState::AttemptNew => {
                {
                    let cfg = store.config_mut();
                    cfg.wifi_ssid = new_ssid.clone();
                    cfg.wifi_passphrase = new_passphrase.clone();
                }
                if let Err(e) = store.save() {
                    error!("rotation aborted, could not persist new credentials: {e}");
                    let cfg = store.config_mut();
                    cfg.wifi_ssid = cfg.wifi_backup.ssid.clone();
                    cfg.wifi_passphrase = cfg.wifi_backup.passphrase.clone();
                    return RotationOutcome::RolledBack;
                }
                net.disconnect();
                info!("joining new network '{new_ssid}'");
                match net.join(new_ssid.as_str(), new_passphrase.as_str(), JOIN_TIMEOUT) {
                    Ok(()) => RotationState::Committed,
                    Err(e) => {
                        warn!("new network join failed: {e}");
                        RotationState::RestoreBackup
                    }
                }
            }

            RotationState::RestoreBackup => {
                match store.restore_backup_wifi() {
                    Ok(true) => {}
                    Ok(false) => error!("no backup to restore after failed join"),
                    // Fields are already restored in memory; rejoin with them
                    // even though the persist failed.
                    Err(e) => error!("could not persist restored credentials: {e}"),
                }
                let ssid = store.config().wifi_ssid.clone();
                let passphrase = store.config().wifi_passphrase.clone();
                info!("reconnecting to '{ssid}'");
                match net.join(ssid.as_str(), passphrase.as_str(), JOIN_TIMEOUT) {
                    Ok(()) => RotationState::Reconnected,
                    Err(e) => {
                        error!("rejoin of '{ssid}' failed: {e}");
                        RotationState::Fatal
                    }
                }
            }

            RotationState::Committed => {
                info!("rotation committed, now on '{new_ssid}'");
                return RotationOutcome::Committed;
            }
            RotationState::Reconnected => {
                warn!("rotation rolled back, still on '{}'", store.config().wifi_ssid);
                return RotationOutcome::RolledBack;
            }
            RotationState::Fatal => {
                error!("rotation fatal: no network reachable");
                return RotationOutcome::Fatal;
            }
        };
        info!("rotation: {state} -> {next}");
        state = next;
    }
}
