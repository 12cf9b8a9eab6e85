//! Fuzz target: `ConfigStore::load` over arbitrary flash images
//!
//! Plants arbitrary bytes in the config region and loads the record,
//! asserting that decoding never panics, the repaired version always lands
//! in the plausible range, and that decode/encode is a fixed point: saving
//! what was loaded and loading it again yields the same record.
//!
//! cargo fuzz run fuzz_record_decoder

#![no_main]

use greenlink::adapters::flash::{CONFIG_REGION_LEN, FlashRegion};
use greenlink::app::ports::StoragePort;
use greenlink::store::{ConfigStore, RECORD_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut region = FlashRegion::in_memory(CONFIG_REGION_LEN);
    let len = data.len().min(RECORD_LEN);
    region.write(0, &data[..len]).unwrap();
    region.commit().unwrap();

    let mut store = ConfigStore::new(region);
    let report = store.load().unwrap();

    // An implausible version must never survive a load.
    assert!((0..=greenlink::config::CONFIG_VERSION_MAX).contains(&store.config().config_version));

    // A record that passed the checksum and then got repaired was
    // re-persisted, so the next load must be clean.
    if report.checksum_ok && report.version_repaired {
        let report = store.load().unwrap();
        assert!(report.checksum_ok && !report.version_repaired);
    }

    // Decode then encode is a fixed point for whatever was decoded.
    let decoded = store.config().clone();
    store.save().unwrap();
    let report = store.load().unwrap();
    assert!(report.checksum_ok, "a saved record must verify");
    assert_eq!(*store.config(), decoded);
});
