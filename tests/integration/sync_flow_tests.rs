//! Integration tests for the boot and sync loop.
//!
//! Full `SyncService` flows against scripted HTTP and the simulation
//! WiFi/flash adapters: boot joins with backup fallback, heartbeat and
//! telemetry cadence, config drift chase and its persistence.

use std::time::Instant;

use greenlink::adapters::flash::{CONFIG_REGION_LEN, FlashRegion};
use greenlink::adapters::ota::OtaFlasher;
use greenlink::adapters::wifi::WifiStation;
use greenlink::app::events::AppEvent;
use greenlink::app::service::SyncService;
use greenlink::command::ExecOutcome;
use greenlink::config::{
    FIRMWARE_VERSION, HEARTBEAT_INTERVAL, SensorKind, SensorSlot, SlotName, Ssid,
    TELEMETRY_INTERVAL,
};
use greenlink::store::ConfigStore;

use crate::mock_ports::{FixedSensors, RecordingSink, ScriptedHttp, provisioned_store, test_client};

/// Provisioned store plus a station already associated with its network.
fn online_setup() -> (SyncService, ConfigStore<FlashRegion>, WifiStation, RecordingSink) {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated_any();
    let mut sink = RecordingSink::new();
    let service = SyncService::new(test_client());
    assert!(service.boot_connect(&mut store, &mut net, &mut sink));
    (service, store, net, sink)
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_announces_firmware_and_config_version() {
    let store = provisioned_store();
    let mut sink = RecordingSink::new();
    SyncService::new(test_client()).start(&store, &mut sink);

    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::Started {
            firmware_version: FIRMWARE_VERSION,
            config_version: 0,
        }]
    ));
}

// ── Boot connect ──────────────────────────────────────────────

#[test]
fn boot_connect_joins_the_primary_network() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();

    assert!(SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));
    assert_eq!(net.join_history(), ["greenhouse"]);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::LinkUp { .. }))
    );
}

#[test]
fn boot_connect_falls_back_to_the_backup_and_promotes_it() {
    let mut store = provisioned_store();
    store.backup_current_wifi().unwrap();
    // The primary was later renamed to something that no longer answers.
    store.config_mut().wifi_ssid = Ssid::new("renamed-ap").unwrap();
    store.save().unwrap();

    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();
    assert!(SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));

    assert_eq!(net.join_history(), ["renamed-ap", "greenhouse"]);
    assert_eq!(
        store.config().wifi_ssid.as_str(),
        "greenhouse",
        "backup must be promoted to primary"
    );
    store.load().unwrap();
    assert_eq!(store.config().wifi_ssid.as_str(), "greenhouse");
}

#[test]
fn boot_connect_without_credentials_stays_offline() {
    let mut store = ConfigStore::new(FlashRegion::in_memory(CONFIG_REGION_LEN));
    store.load().unwrap();
    let mut net = WifiStation::simulated_any();
    let mut sink = RecordingSink::new();

    assert!(!SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));
    assert!(net.join_history().is_empty());
}

#[test]
fn boot_connect_fails_when_primary_is_dead_and_no_backup_exists() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&[]);
    let mut sink = RecordingSink::new();

    assert!(!SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));
    // Without a backup there is exactly one attempt.
    assert_eq!(net.join_history(), ["greenhouse"]);
}

// ── Tick cadence ──────────────────────────────────────────────

#[test]
fn first_tick_heartbeats_and_posts_telemetry() {
    let (mut service, mut store, mut net, mut sink) = online_setup();
    store.config_mut().sensors[0] = SensorSlot {
        pin: 17,
        kind: SensorKind::SoilMoisture,
        name: SlotName::from_truncated("bed A"),
    };
    store.save().unwrap();

    let mut http = ScriptedHttp::new();
    http.push_ok(200, r#"{"success":true,"config_version":0}"#);
    http.push_ok(201, "");

    let outcome = service.tick(
        Instant::now(),
        &mut store,
        &mut http,
        &mut net,
        &mut OtaFlasher::simulated(),
        &mut FixedSensors,
        &mut sink,
    );

    assert_eq!(outcome, ExecOutcome::Continue);
    assert_eq!(http.requests.len(), 2);
    assert_eq!(http.requests[0].endpoint(), "device_heartbeat_with_config_v2");
    assert_eq!(http.requests[1].endpoint(), "insert_sensor_readings");
    assert_eq!(http.requests[1].body["readings"][0]["value"], 40.0);
}

#[test]
fn heartbeat_cadence_is_respected() {
    let (mut service, mut store, mut net, mut sink) = online_setup();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, r#"{"success":true,"config_version":0}"#);
    http.push_ok(200, r#"{"success":true,"config_version":0}"#);
    let mut ota = OtaFlasher::simulated();
    let mut sensors = FixedSensors;

    let t0 = Instant::now();
    let outcome = service.tick(t0, &mut store, &mut http, &mut net, &mut ota, &mut sensors, &mut sink);
    assert_eq!(outcome, ExecOutcome::Continue);
    assert_eq!(http.requests.len(), 1);

    // Telemetry comes due first, but with no configured slots nothing is
    // posted and the heartbeat is still ahead.
    let _ = service.tick(
        t0 + TELEMETRY_INTERVAL,
        &mut store,
        &mut http,
        &mut net,
        &mut ota,
        &mut sensors,
        &mut sink,
    );
    assert_eq!(http.requests.len(), 1);

    let _ = service.tick(
        t0 + HEARTBEAT_INTERVAL,
        &mut store,
        &mut http,
        &mut net,
        &mut ota,
        &mut sensors,
        &mut sink,
    );
    assert_eq!(http.requests.len(), 2);
}

#[test]
fn offline_tick_never_touches_the_wire() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&[]);
    let mut sink = RecordingSink::new();
    let mut service = SyncService::new(test_client());
    let mut http = ScriptedHttp::new();

    let outcome = service.tick(
        Instant::now(),
        &mut store,
        &mut http,
        &mut net,
        &mut OtaFlasher::simulated(),
        &mut FixedSensors,
        &mut sink,
    );

    assert_eq!(outcome, ExecOutcome::Continue);
    assert!(http.requests.is_empty());
}

// ── Config drift ──────────────────────────────────────────────

#[test]
fn config_drift_fetches_applies_and_persists() {
    let (mut service, mut store, mut net, mut sink) = online_setup();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, r#"{"success":true,"config_version":7}"#);
    http.push_ok(
        200,
        r#"[{"sensor_type":"temperature","port_id":"D1"},
            {"sensor_type":"soil_moisture","port_id":"A0"}]"#,
    );

    let outcome = service.tick(
        Instant::now(),
        &mut store,
        &mut http,
        &mut net,
        &mut OtaFlasher::simulated(),
        &mut FixedSensors,
        &mut sink,
    );

    assert_eq!(outcome, ExecOutcome::Continue);
    assert_eq!(http.requests[1].endpoint(), "get_device_sensor_config");
    assert_eq!(store.config().config_version, 7);
    assert_eq!(store.config().sensors[0].kind, SensorKind::Dht22);
    assert_eq!(store.config().sensors[0].pin, 5);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::ConfigApplied { version: 7, slots: 2 }))
    );

    // The version must survive a reload, or every boot would refetch.
    store.load().unwrap();
    assert_eq!(store.config().config_version, 7);
}

#[test]
fn failed_fetch_retries_on_the_next_heartbeat() {
    let (mut service, mut store, mut net, mut sink) = online_setup();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, r#"{"success":true,"config_version":7}"#);
    http.push_ok(503, "");
    http.push_ok(200, r#"{"success":true,"config_version":7}"#);
    http.push_ok(200, r#"[{"sensor_type":"water_level","port_id":"GPIO13"}]"#);
    let mut ota = OtaFlasher::simulated();
    let mut sensors = FixedSensors;

    let t0 = Instant::now();
    let _ = service.tick(t0, &mut store, &mut http, &mut net, &mut ota, &mut sensors, &mut sink);
    assert_eq!(
        store.config().config_version,
        0,
        "version must not advance past a failed fetch"
    );

    let _ = service.tick(
        t0 + HEARTBEAT_INTERVAL,
        &mut store,
        &mut http,
        &mut net,
        &mut ota,
        &mut sensors,
        &mut sink,
    );
    assert_eq!(store.config().config_version, 7);
    assert_eq!(http.requests_to("get_device_sensor_config").len(), 2);
    assert_eq!(store.config().sensors[0].kind, SensorKind::WaterLevel);
    assert_eq!(store.config().sensors[0].pin, 13);
}
