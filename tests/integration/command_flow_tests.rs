//! Integration tests for command dispatch through the heartbeat.
//!
//! Each test scripts a heartbeat response carrying a command and drives
//! one service tick, then asserts on the acknowledgment traffic, the
//! persisted config and the loop disposition the tick returns.

use std::time::Instant;

use serde_json::json;

use greenlink::adapters::flash::FlashRegion;
use greenlink::adapters::ota::OtaFlasher;
use greenlink::adapters::wifi::WifiStation;
use greenlink::app::events::AppEvent;
use greenlink::app::ports::{NetworkPort, OtaError, OtaTransport};
use greenlink::app::service::SyncService;
use greenlink::command::ExecOutcome;
use greenlink::store::ConfigStore;

use crate::mock_ports::{FixedSensors, RecordingSink, ScriptedHttp, provisioned_store, test_client};

fn heartbeat_with(command: &serde_json::Value) -> String {
    json!({
        "success": true,
        "config_version": 0,
        "command": command,
    })
    .to_string()
}

/// Provisioned store, station associated with `greenhouse`, with
/// `glasshouse-5g` also answering for rotation commands.
fn online() -> (SyncService, ConfigStore<FlashRegion>, WifiStation, RecordingSink) {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse", "glasshouse-5g"]);
    let mut sink = RecordingSink::new();
    let service = SyncService::new(test_client());
    assert!(service.boot_connect(&mut store, &mut net, &mut sink));
    (service, store, net, sink)
}

fn tick(
    service: &mut SyncService,
    store: &mut ConfigStore<FlashRegion>,
    http: &mut ScriptedHttp,
    net: &mut WifiStation,
    ota: &mut OtaFlasher,
    sink: &mut RecordingSink,
) -> ExecOutcome {
    service.tick(Instant::now(), store, http, net, ota, &mut FixedSensors, sink)
}

// ── reset ─────────────────────────────────────────────────────

#[test]
fn reset_acks_success_then_requests_restart() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, &heartbeat_with(&json!({"id": "cmd-1", "type": "reset"})));
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::RestartRequested);
    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["command_id_param"], "cmd-1");
    assert_eq!(acks[0].body["success_param"], true);
    assert!(acks[0].body.get("error_message_param").is_none());
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::CommandExecuted {
            outcome: ExecOutcome::RestartRequested,
            ..
        }
    )));
}

// ── wifi_update ───────────────────────────────────────────────

#[test]
fn wifi_update_rotates_and_acks_over_the_new_network() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({
            "id": "cmd-2",
            "type": "wifi_update",
            "payload": {"ssid": "glasshouse-5g", "password": "irrigation"},
        })),
    );
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::RestartRequested);
    assert_eq!(store.config().wifi_ssid.as_str(), "glasshouse-5g");
    assert_eq!(store.config().wifi_passphrase.as_str(), "irrigation");
    assert!(store.has_valid_backup());
    assert_eq!(store.config().wifi_backup.ssid.as_str(), "greenhouse");
    assert_eq!(
        net.join_history().last().map(String::as_str),
        Some("glasshouse-5g")
    );

    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["success_param"], true);

    // Persisted: the restart boots straight onto the new network.
    store.load().unwrap();
    assert_eq!(store.config().wifi_ssid.as_str(), "glasshouse-5g");
}

#[test]
fn wifi_update_rolls_back_and_reports_the_failure() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();
    let mut service = SyncService::new(test_client());
    assert!(service.boot_connect(&mut store, &mut net, &mut sink));

    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({
            "id": "cmd-3",
            "type": "wifi_update",
            "payload": {"ssid": "ghost-ap", "password": "nope"},
        })),
    );
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Continue);
    assert_eq!(store.config().wifi_ssid.as_str(), "greenhouse");
    assert!(net.is_connected(), "must be back on the old network");

    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["success_param"], false);
    assert_eq!(
        acks[0].body["error_message_param"],
        "WiFi connection failed, restored backup"
    );
}

#[test]
fn wifi_update_with_no_network_left_is_fatal_without_ack() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();
    let mut service = SyncService::new(test_client());
    assert!(service.boot_connect(&mut store, &mut net, &mut sink));

    // The old AP goes away while the device is still associated, so the
    // heartbeat works but no rejoin can succeed.
    net.drop_network("greenhouse");

    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({
            "id": "cmd-4",
            "type": "wifi_update",
            "payload": {"ssid": "ghost-ap"},
        })),
    );
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Fatal);
    assert!(!net.is_connected());
    assert_eq!(
        http.requests.len(),
        1,
        "no acknowledgment can be delivered without a link"
    );
    // The restore still happened, so the post-restart boot retries the
    // old credentials.
    assert_eq!(store.config().wifi_ssid.as_str(), "greenhouse");
}

// ── firmware_update ───────────────────────────────────────────

#[test]
fn firmware_update_success_stages_the_image_without_ack() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({
            "id": "cmd-5",
            "type": "firmware_update",
            "payload": {"url": "https://img.example/fw-3.3.0.bin", "version": "v3.3.0"},
        })),
    );
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::RestartRequested);
    assert_eq!(
        ota.staged(),
        [("https://img.example/fw-3.3.0.bin".to_string(), OtaTransport::Tls)]
    );
    assert!(
        http.requests_to("acknowledge_device_command").is_empty(),
        "success is confirmed by the version in the next heartbeat"
    );
}

#[test]
fn firmware_update_failure_acks_the_error() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({
            "id": "cmd-6",
            "type": "firmware_update",
            "payload": {"url": "http://img.example/fw.bin"},
        })),
    );
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::failing(OtaError::TransferFailed);

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Continue);
    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["success_param"], false);
    assert_eq!(acks[0].body["error_message_param"], "OTA update failed");
}

// ── unknown and malformed ─────────────────────────────────────

#[test]
fn unknown_command_type_is_acked_as_failed() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, &heartbeat_with(&json!({"id": "cmd-7", "type": "blink_leds"})));
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Continue);
    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["success_param"], false);
    assert_eq!(acks[0].body["error_message_param"], "Unknown command type");
}

#[test]
fn malformed_command_with_id_is_acked_with_the_reason() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(
        200,
        &heartbeat_with(&json!({"id": "cmd-8", "type": "wifi_update", "payload": {}})),
    );
    http.push_ok(200, "{}");
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Continue);
    let acks = http.requests_to("acknowledge_device_command");
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].body["command_id_param"], "cmd-8");
    assert_eq!(acks[0].body["success_param"], false);
    assert_eq!(acks[0].body["error_message_param"], "wifi_update requires an ssid");
    assert!(
        !sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::CommandExecuted { .. })),
        "a rejected command never executes"
    );
}

#[test]
fn command_without_id_is_dropped_without_ack() {
    let (mut service, mut store, mut net, mut sink) = online();
    let mut http = ScriptedHttp::new();
    http.push_ok(200, &heartbeat_with(&json!({"type": "reset"})));
    let mut ota = OtaFlasher::simulated();

    let outcome = tick(&mut service, &mut store, &mut http, &mut net, &mut ota, &mut sink);

    assert_eq!(outcome, ExecOutcome::Continue);
    assert!(http.requests_to("acknowledge_device_command").is_empty());
}
