//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! Every adapter has a real ESP-IDF backend and a host simulation behind
//! `cfg(target_os = "espidf")`, so the whole engine runs in tests.
//!
//! | Adapter    | Implements  | Connects to                       |
//! |------------|-------------|-----------------------------------|
//! | `flash`    | StoragePort | `config` data partition / RAM     |
//! | `http`     | HttpPort    | EspHttpConnection / no-cloud stub |
//! | `log_sink` | EventSink   | Serial log output                 |
//! | `ota`      | OtaPort     | esp-ota partition writer / stub   |
//! | `sensors`  | SensorPort  | (no drivers) / synthesized values |
//! | `system`   | —           | esp_restart / process exit        |
//! | `wifi`     | NetworkPort | ESP-IDF WiFi STA / reachable set  |

pub mod flash;
pub mod http;
pub mod log_sink;
pub mod ota;
pub mod sensors;
pub mod system;
pub mod wifi;
