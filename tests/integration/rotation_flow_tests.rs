//! Integration tests for credential rotation across reboots.
//!
//! The rotation engine runs against the simulation WiFi and flash
//! adapters; a reboot is modelled by reloading the record and running the
//! boot-time join on a fresh service. The point under test is that every
//! rotation outcome, including a power cut at the worst moment, leaves a
//! record the next boot can get online with.

use greenlink::adapters::wifi::WifiStation;
use greenlink::app::service::SyncService;
use greenlink::config::{Passphrase, Ssid};
use greenlink::rotation::{RotationOutcome, rotate};

use crate::mock_ports::{RecordingSink, provisioned_store, test_client};

fn creds(ssid: &str, passphrase: &str) -> (Ssid, Passphrase) {
    (Ssid::new(ssid).unwrap(), Passphrase::new(passphrase).unwrap())
}

#[test]
fn committed_rotation_boots_onto_the_new_network() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse", "glasshouse-5g"]);
    let (ssid, passphrase) = creds("glasshouse-5g", "irrigation");

    assert_eq!(
        rotate(&mut store, &mut net, &ssid, &passphrase),
        RotationOutcome::Committed
    );

    // Reboot: reload the record, fresh station, boot join.
    store.load().unwrap();
    let mut net = WifiStation::simulated(&["greenhouse", "glasshouse-5g"]);
    let mut sink = RecordingSink::new();
    assert!(SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));
    assert_eq!(net.join_history(), ["glasshouse-5g"]);
}

#[test]
fn rolled_back_rotation_boots_onto_the_old_network() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let (ssid, passphrase) = creds("ghost-ap", "nope");

    assert_eq!(
        rotate(&mut store, &mut net, &ssid, &passphrase),
        RotationOutcome::RolledBack
    );
    assert!(store.has_valid_backup(), "backup survives a rollback");

    store.load().unwrap();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();
    assert!(SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));
    assert_eq!(net.join_history(), ["greenhouse"]);
}

#[test]
fn power_loss_after_credential_write_recovers_through_the_backup() {
    // Reproduce the record state rotation persists right before it tries
    // the new network: backup saved, new credentials already primary.
    let mut store = provisioned_store();
    store.backup_current_wifi().unwrap();
    store.config_mut().wifi_ssid = Ssid::new("ghost-ap").unwrap();
    store.config_mut().wifi_passphrase = Passphrase::new("nope").unwrap();
    store.save().unwrap();

    // Power cut. The next boot finds the ghost primary, falls back to
    // the backup and promotes it.
    store.load().unwrap();
    let mut net = WifiStation::simulated(&["greenhouse"]);
    let mut sink = RecordingSink::new();
    assert!(SyncService::new(test_client()).boot_connect(&mut store, &mut net, &mut sink));

    assert_eq!(net.join_history(), ["ghost-ap", "greenhouse"]);
    assert_eq!(store.config().wifi_ssid.as_str(), "greenhouse");
    store.load().unwrap();
    assert_eq!(
        store.config().wifi_ssid.as_str(),
        "greenhouse",
        "promotion must be persisted"
    );
}

#[test]
fn second_rotation_overwrites_the_backup_slot() {
    let mut store = provisioned_store();
    let mut net = WifiStation::simulated(&["greenhouse", "glasshouse-5g", "propagation-tent"]);

    let (first_ssid, first_pass) = creds("glasshouse-5g", "irrigation");
    assert_eq!(
        rotate(&mut store, &mut net, &first_ssid, &first_pass),
        RotationOutcome::Committed
    );

    let (second_ssid, second_pass) = creds("propagation-tent", "misting");
    assert_eq!(
        rotate(&mut store, &mut net, &second_ssid, &second_pass),
        RotationOutcome::Committed
    );

    assert_eq!(store.config().wifi_ssid.as_str(), "propagation-tent");
    assert_eq!(store.config().wifi_backup.ssid.as_str(), "glasshouse-5g");
}
