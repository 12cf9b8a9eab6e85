//! GreenLink Node Firmware — Main Entry Point
//!
//! Hexagonal architecture with a blocking sync loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  FlashRegion    HttpClient   WifiStation     OtaFlasher        │
//! │  (StoragePort)  (HttpPort)   (NetworkPort)   (OtaPort)         │
//! │  SlotSampler    LogEventSink                                   │
//! │  (SensorPort)   (EventSink)                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             SyncService (pure logic)                   │    │
//! │  │  ConfigStore · SyncClient · Commands · Rotation        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
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

// ── Imports ───────────────────────────────────────────────────
use std::time::Instant;

use anyhow::Result;
use log::{error, info};

use adapters::flash::FlashRegion;
use adapters::http::HttpClient;
use adapters::log_sink::LogEventSink;
use adapters::ota::OtaFlasher;
use adapters::sensors::SlotSampler;
use adapters::wifi::WifiStation;
use app::service::SyncService;
use cloud::SyncClient;
use command::ExecOutcome;
use error::Error;
use store::ConfigStore;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("GreenLink node {} starting", config::FIRMWARE_VERSION);

    // ── 2. Construct adapters ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    let (region, mut wifi, mut ota) = {
        let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
        let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
        let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;
        let wifi = WifiStation::new(peripherals.modem, sysloop, nvs).map_err(Error::from)?;
        let region = FlashRegion::mount().map_err(Error::from)?;
        (region, wifi, OtaFlasher::new())
    };
    #[cfg(not(target_os = "espidf"))]
    let (region, mut wifi, mut ota) = (
        FlashRegion::in_memory(adapters::flash::CONFIG_REGION_LEN),
        WifiStation::simulated_any(),
        OtaFlasher::simulated(),
    );

    let mut http = HttpClient::new();
    let mut sensors = SlotSampler::new();
    let mut sink = LogEventSink::new();

    // ── 3. Load the persisted record ──────────────────────────
    let mut store = ConfigStore::new(region);
    let report = store.load().map_err(Error::from)?;
    if report.version_repaired {
        info!("config version was repaired; the next heartbeat forces a full sync");
    }

    // A blank simulated region would park below exactly like a blank
    // device; provision a demo identity so host runs exercise the loop.
    #[cfg(not(target_os = "espidf"))]
    if store.validate().is_err() {
        store
            .provision("SIM-NODE-1", "sim-greenhouse", "sim-passphrase")
            .map_err(Error::from)?;
    }

    if let Err(reason) = store.validate() {
        // ConfigStore::provision is the integration point for whatever
        // provisioning transport the product wires up.
        error!("stored config rejected ({reason}) — parked until provisioning writes a valid record");
        loop {
            std::thread::sleep(config::HEARTBEAT_INTERVAL);
        }
    }

    // ── 4. Cloud client + sync service ────────────────────────
    let client = SyncClient::new(config::API_BASE_URL, config::API_KEY);
    let mut service = SyncService::new(client);
    service.start(&store, &mut sink);

    // ── 5. Get online ─────────────────────────────────────────
    if !service.boot_connect(&mut store, &mut wifi, &mut sink) {
        error!("no stored network reachable, restarting");
        adapters::system::restart();
    }

    info!("System ready. Entering sync loop.");

    // ── 6. Sync loop ──────────────────────────────────────────
    loop {
        match service.tick(
            Instant::now(),
            &mut store,
            &mut http,
            &mut wifi,
            &mut ota,
            &mut sensors,
            &mut sink,
        ) {
            ExecOutcome::Continue => {}
            ExecOutcome::RestartRequested => {
                info!("restart requested, rebooting");
                adapters::system::restart();
            }
            ExecOutcome::Fatal => {
                error!("rotation left the node offline, rebooting");
                adapters::system::restart();
            }
        }
        std::thread::sleep(config::LOOP_TICK);
    }
}
