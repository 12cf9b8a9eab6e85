//! Device configuration record
//!
//! The persistent identity and wiring of a node: composite device id, WiFi
//! credentials (plus rollback backup), cloud device key, the sensor slot
//! table and the cloud config version. Persisted as a fixed-layout record by
//! [`ConfigStore`](crate::store::ConfigStore).
//!
//! Every capacity-limited field is a bounded string type whose constructor
//! rejects oversized input. The one exception is [`SlotName`]: display names
//! coming from the cloud are truncated to fit, by policy.

use core::fmt;
use core::time::Duration;

/// Firmware version reported in every heartbeat.
pub const FIRMWARE_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Number of sensor slots in the record.
pub const MAX_SENSOR_SLOTS: usize = 4;

/// Highest cloud config version accepted as plausible on load.
pub const CONFIG_VERSION_MAX: i32 = 10_000;

/// Bounded join wait, both for rotation attempts and the boot-time join.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll step used inside bounded waits.
pub const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Heartbeat cadence of the main loop.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Telemetry cadence of the main loop.
pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Idle step of the main loop between cadence checks.
pub const LOOP_TICK: Duration = Duration::from_secs(1);

/// Control-plane base URL. Injected at build time so fleets can point at
/// staging without a source change.
pub const API_BASE_URL: &str = match option_env!("GREENLINK_API_BASE") {
    Some(url) => url,
    None => "https://cloud.greenlink.example",
};

/// Project API key, sent as `apikey` and as the bearer token on every
/// control-plane call. The fallback only satisfies host builds.
pub const API_KEY: &str = match option_env!("GREENLINK_API_KEY") {
    Some(key) => key,
    None => "anon-key-not-set",
};

/// A bounded-string constructor was handed oversized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOverflow {
    /// Record field that rejected the input.
    pub field: &'static str,
    /// Maximum length in bytes.
    pub max: usize,
}

impl fmt::Display for FieldOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exceeds {} bytes", self.field, self.max)
    }
}

macro_rules! bounded_string {
    ($(#[$meta:meta])* $name:ident, $cap:literal, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(heapless::String<$cap>);

        impl $name {
            /// Maximum length in bytes.
            pub const CAPACITY: usize = $cap;

            /// Build from `s`, rejecting input longer than the capacity.
            pub fn new(s: &str) -> Result<Self, FieldOverflow> {
                let mut inner = heapless::String::new();
                inner
                    .push_str(s)
                    .map_err(|()| FieldOverflow { field: $field, max: $cap })?;
                Ok(Self(inner))
            }

            /// Crate-internal: adopt an already-bounded decoded field.
            pub(crate) fn from_raw(inner: heapless::String<$cap>) -> Self {
                Self(inner)
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.0.as_str())
            }
        }
    };
}

bounded_string!(
    /// Composite device id, human-entered at provisioning, stored uppercase.
    DeviceId, 14, "composite_device_id"
);

impl DeviceId {
    /// Build from raw human input: trimmed and uppercased. Uppercasing may
    /// lengthen some characters, which still counts against the bound.
    pub fn normalized(raw: &str) -> Result<Self, FieldOverflow> {
        let mut inner = heapless::String::new();
        for ch in raw.trim().chars().flat_map(char::to_uppercase) {
            inner
                .push(ch)
                .map_err(|()| FieldOverflow { field: "composite_device_id", max: Self::CAPACITY })?;
        }
        Ok(Self(inner))
    }
}

bounded_string!(
    /// WiFi station SSID.
    Ssid, 32, "wifi_ssid"
);

bounded_string!(
    /// WiFi station passphrase (WPA2 limit).
    Passphrase, 63, "wifi_passphrase"
);

bounded_string!(
    /// Cloud device key: 64 lowercase hex chars once minted, empty before.
    DeviceKey, 64, "device_key"
);

impl DeviceKey {
    /// Whether a key has been minted for this device.
    pub fn is_set(&self) -> bool {
        !self.is_empty()
    }
}

/// Sensor display name shown in the cloud UI.
///
/// Unlike the other bounded fields this one truncates oversized input:
/// the name is cosmetic and derives from cloud sensor-type strings that
/// may legitimately exceed the stored width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotName(heapless::String<31>);

impl SlotName {
    /// Maximum length in bytes.
    pub const CAPACITY: usize = 31;

    /// Build from `s`, keeping as many whole characters as fit.
    pub fn from_truncated(s: &str) -> Self {
        let mut inner = heapless::String::new();
        for ch in s.chars() {
            if inner.push(ch).is_err() {
                break;
            }
        }
        Self(inner)
    }

    /// Crate-internal: adopt an already-bounded decoded field.
    pub(crate) fn from_raw(inner: heapless::String<31>) -> Self {
        Self(inner)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Sensor kind codes shared with the persisted record and the initializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    /// Slot is empty.
    #[default]
    None = 0,
    Dht22 = 1,
    Dht11 = 2,
    SoilMoisture = 3,
    WaterLevel = 4,
}

impl SensorKind {
    /// Decode a stored kind code. Unknown codes read back as `None` so a
    /// record written by newer firmware degrades to an empty slot.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Dht22,
            2 => Self::Dht11,
            3 => Self::SoilMoisture,
            4 => Self::WaterLevel,
            _ => Self::None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// DHT-class sensors yield temperature and humidity channels.
    pub fn is_dht(self) -> bool {
        matches!(self, Self::Dht22 | Self::Dht11)
    }
}

/// One sensor slot: GPIO pin, kind and display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSlot {
    pub pin: u8,
    pub kind: SensorKind,
    pub name: SlotName,
}

impl SensorSlot {
    /// A slot counts as configured once the cloud assigned it a kind.
    pub fn is_configured(&self) -> bool {
        self.kind != SensorKind::None
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Previous WiFi credentials kept for rollback during rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiBackup {
    pub ssid: Ssid,
    pub passphrase: Passphrase,
    pub valid: bool,
}

/// The full persistent record. See the module docs of
/// [`store`](crate::store) for the on-flash layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub wifi_ssid: Ssid,
    pub wifi_passphrase: Passphrase,
    pub device_key: DeviceKey,
    pub sensors: [SensorSlot; MAX_SENSOR_SLOTS],
    /// Last cloud config version applied; 0 forces a full resync.
    pub config_version: i32,
    pub wifi_backup: WifiBackup,
}

impl DeviceConfig {
    /// Iterate the configured slots only.
    pub fn configured_slots(&self) -> impl Iterator<Item = &SensorSlot> {
        self.sensors.iter().filter(|s| s.is_configured())
    }
}
