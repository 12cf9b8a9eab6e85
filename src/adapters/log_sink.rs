//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future cloud-side event channel would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                firmware_version,
                config_version,
            } => {
                info!("START | {firmware_version} | config v{config_version}");
            }
            AppEvent::LinkUp { ssid } => {
                info!("LINK  | up on '{ssid}'");
            }
            AppEvent::Heartbeat { cloud_version } => match cloud_version {
                Some(v) => info!("BEAT  | cloud config v{v}"),
                None => info!("BEAT  | cloud config unknown"),
            },
            AppEvent::ConfigApplied { version, slots } => {
                info!("CONF  | v{version} applied ({slots} slots)");
            }
            AppEvent::CommandExecuted { id, outcome } => {
                info!("CMD   | {id} -> {outcome:?}");
            }
        }
    }
}
