//! Cloud sensor-description translation
//!
//! The control plane describes wiring symbolically: a free-form
//! `sensor_type` string and a `port_id` in the legacy NodeMCU/D1-mini
//! naming scheme (`"GPIO4"`, `"D1"`, `"A0"`). This module translates both
//! into the record's pin numbers and kind codes. Pure functions, no I/O;
//! persistence stays with the caller.

use log::warn;

use crate::cloud::protocol::SensorConfigEntry;
use crate::config::{MAX_SENSOR_SLOTS, SensorKind, SensorSlot, SlotName};

/// GPIO numbers behind the `D0`..`D10` silkscreen labels. The cloud keeps
/// naming ports this way regardless of the board the firmware runs on.
const D_PIN_GPIO: [u8; 11] = [16, 5, 4, 0, 2, 14, 12, 13, 15, 3, 1];

/// The legacy board's sole analog input, reported by the cloud as `"A0"`.
pub const ANALOG_PIN: u8 = 17;

/// Entries the cloud uses for slots without an assigned sensor.
const UNCONFIGURED: &str = "unconfigured";

/// Map a cloud `sensor_type` string to a kind code. Case-insensitive;
/// anything unrecognized maps to `None`.
pub fn map_sensor_type(db_type: &str) -> SensorKind {
    let t = db_type.to_ascii_lowercase();
    if t.contains("temp") || t.contains("humidity") {
        SensorKind::Dht22
    } else if t.contains("soil_moisture") {
        SensorKind::SoilMoisture
    } else if t == "water_level" {
        SensorKind::WaterLevel
    } else {
        SensorKind::None
    }
}

/// Extract a GPIO number from a cloud `port_id`.
///
/// `"GPIO<n>"` is taken literally, `"D<n>"` goes through the lookup table,
/// `"A0"` is the analog input; anything else is a best-effort numeric parse
/// with fallback 0.
pub fn parse_port_id(port_id: &str) -> u8 {
    if let Some(rest) = port_id.strip_prefix("GPIO") {
        if let Ok(pin) = rest.parse::<u8>() {
            return pin;
        }
    }
    if let Some(rest) = port_id.strip_prefix('D') {
        if let Ok(d_pin) = rest.parse::<usize>() {
            if d_pin < D_PIN_GPIO.len() {
                return D_PIN_GPIO[d_pin];
            }
        }
    }
    if port_id == "A0" {
        return ANALOG_PIN;
    }
    port_id.parse::<u8>().unwrap_or(0)
}

/// Rebuild the slot table from a fetched cloud configuration.
///
/// Every slot is cleared first. `"unconfigured"` entries are skipped
/// without consuming a slot; surplus entries beyond the table are dropped
/// with a warning. The raw `sensor_type` doubles as the display name,
/// truncated to the stored width. Returns the number of applied slots.
pub fn apply_cloud_config(
    sensors: &mut [SensorSlot; MAX_SENSOR_SLOTS],
    entries: &[SensorConfigEntry],
) -> usize {
    for slot in sensors.iter_mut() {
        slot.clear();
    }

    let mut index = 0;
    for entry in entries {
        if entry.sensor_type == UNCONFIGURED {
            continue;
        }
        if index >= MAX_SENSOR_SLOTS {
            warn!(
                "cloud config has more sensors than {} slots, dropping the rest",
                MAX_SENSOR_SLOTS
            );
            break;
        }
        sensors[index] = SensorSlot {
            pin: parse_port_id(&entry.port_id),
            kind: map_sensor_type(&entry.sensor_type),
            name: SlotName::from_truncated(&entry.sensor_type),
        };
        index += 1;
    }
    index
}
