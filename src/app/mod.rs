//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the orchestration layer of the sync engine:
//! heartbeat cadence, config-drift chasing, command dispatch, telemetry.
//! All interaction with the platform happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! hardware.

pub mod events;
pub mod ports;
pub mod service;
