//! Fuzz target: `command::parse`
//!
//! Feeds arbitrary JSON documents through the command parser and asserts
//! that it never panics, that every accepted command has a usable id, and
//! that every rejection carries a reason (and the id when one was present,
//! so the failure can still be acknowledged).
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use greenlink::command::{self, CommandKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    match command::parse(&value) {
        Ok(cmd) => {
            assert!(!cmd.id.is_empty());
            assert!(cmd.id.len() <= 36);
            match cmd.kind {
                CommandKind::WifiUpdate { ssid, .. } => assert!(!ssid.is_empty()),
                CommandKind::FirmwareUpdate { url, .. } => assert!(!url.is_empty()),
                CommandKind::Reset | CommandKind::Unknown(_) => {}
            }
        }
        Err(rejection) => {
            assert!(!rejection.reason.is_empty());
            if let Some(id) = rejection.id {
                assert!(!id.is_empty());
            }
        }
    }
});
