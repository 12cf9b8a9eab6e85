//! Greenhouse node remote-management firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod cloud;
pub mod command;
pub mod config;
pub mod error;
pub mod mapper;
pub mod rotation;
pub mod store;
pub mod update;
