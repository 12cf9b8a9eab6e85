//! Outbound application events.
//!
//! The [`SyncService`](super::service::SyncService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log to serial, record in tests.

use crate::command::{CommandId, ExecOutcome};
use crate::config::Ssid;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service started (carries the stored config version).
    Started {
        firmware_version: &'static str,
        config_version: i32,
    },

    /// The station joined a network.
    LinkUp { ssid: Ssid },

    /// A heartbeat round-trip completed.
    Heartbeat { cloud_version: Option<i32> },

    /// A fetched cloud configuration was applied and persisted.
    ConfigApplied { version: i32, slots: usize },

    /// A device command ran to completion.
    CommandExecuted { id: CommandId, outcome: ExecOutcome },
}
