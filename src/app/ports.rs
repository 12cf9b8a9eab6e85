//! Port traits — the hexagonal boundary between domain logic and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SyncService / ConfigStore (domain)
//! ```
//!
//! Driven adapters (flash region, HTTP client, WiFi station, OTA primitive,
//! sensor sampling, event sinks) implement these traits. The domain consumes
//! them via generics, so core logic never touches ESP-IDF directly and every
//! behavior runs on the host under the simulation adapters.
//!
//! All port errors are typed — callers must handle every variant explicitly.

use core::time::Duration;

use crate::config::SensorSlot;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ flash region)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent region with EEPROM-like semantics: reads
/// observe the last committed image, writes are staged until [`commit`]
/// publishes them atomically.
///
/// [`commit`]: StoragePort::commit
pub trait StoragePort {
    /// Fill `buf` from the committed image starting at `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Stage `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Publish all staged writes.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Region size in bytes.
    fn capacity(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// HTTP port (driven adapter: domain → cloud control plane)
// ───────────────────────────────────────────────────────────────

/// A buffered HTTP response. Bodies on this path are small JSON documents;
/// firmware images never travel through this port (see [`OtaPort`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP client for the JSON control-plane exchanges.
pub trait HttpPort {
    /// POST `body` to `url` with the given headers and buffer the response.
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<HttpResponse, HttpError>;
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ WiFi station)
// ───────────────────────────────────────────────────────────────

/// WiFi station control. `join` blocks with a deadline, polling the link
/// state at short steps — there is no async runtime in this firmware.
pub trait NetworkPort {
    fn is_connected(&self) -> bool;

    /// Drop the current association, if any.
    fn disconnect(&mut self);

    /// Reconfigure the station and wait up to `timeout` for an association.
    fn join(
        &mut self,
        ssid: &str,
        passphrase: &str,
        timeout: Duration,
    ) -> Result<(), NetworkError>;
}

// ───────────────────────────────────────────────────────────────
// OTA port (driven adapter: domain → platform update primitive)
// ───────────────────────────────────────────────────────────────

/// Transport selected for the image download, derived from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaTransport {
    /// HTTPS with the platform's insecure (non-verifying) client.
    Tls,
    /// Plain HTTP.
    Plain,
}

impl core::fmt::Display for OtaTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Tls => f.write_str("TLS"),
            Self::Plain => f.write_str("plain HTTP"),
        }
    }
}

/// Streams and stages a firmware image. On `Ok(())` the image has been
/// written and marked bootable; the caller decides when to restart.
pub trait OtaPort {
    fn apply_from_url(&mut self, url: &str, transport: OtaTransport) -> Result<(), OtaError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Measurement channel of one scalar reading, with its wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementChannel {
    Temperature,
    Humidity,
    SoilMoisture,
    WaterLevel,
}

impl MeasurementChannel {
    /// `sensor_type` string posted with a reading.
    pub fn sensor_type(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::SoilMoisture => "soil_moisture",
            Self::WaterLevel => "water_level",
        }
    }

    /// `unit` string posted with a reading.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            _ => "%",
        }
    }

    /// Suffix appended to the slot display name in a reading.
    pub fn name_suffix(self) -> &'static str {
        match self {
            Self::Temperature => " (Temp)",
            Self::Humidity => " (Hum)",
            Self::SoilMoisture | Self::WaterLevel => "",
        }
    }
}

/// One scalar reading from a configured slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub channel: MeasurementChannel,
    pub value: f32,
}

/// Samples one configured slot. A DHT-class slot yields temperature and
/// humidity; analog slots yield a single value; a failed read yields an
/// empty set and is not an error.
pub trait SensorPort {
    fn sample(&mut self, slot: &SensorSlot) -> heapless::Vec<Measurement, 2>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, cloud,
/// test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access beyond the region capacity.
    OutOfBounds,
    /// Generic I/O error from the flash backend.
    IoError,
    /// The staged image could not be published.
    CommitFailed,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::IoError => write!(f, "I/O error"),
            Self::CommitFailed => write!(f, "commit failed"),
        }
    }
}

/// Errors from [`HttpPort`] operations. HTTP status codes are not errors;
/// they come back in [`HttpResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Connection could not be established.
    ConnectFailed,
    /// Request could not be written.
    RequestFailed,
    /// Response could not be read.
    ReadFailed,
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::RequestFailed => write!(f, "request failed"),
            Self::ReadFailed => write!(f, "response read failed"),
        }
    }
}

/// Errors from [`NetworkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// No association within the deadline.
    JoinTimeout,
    /// The WiFi driver rejected the operation.
    Driver,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::JoinTimeout => write!(f, "join timed out"),
            Self::Driver => write!(f, "WiFi driver error"),
        }
    }
}

/// Classified outcomes of a failed OTA attempt, mirrored into the failure
/// acknowledgment sent to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// Download or flash write failed partway.
    TransferFailed,
    /// The server reported nothing to install.
    NoUpdateAvailable,
    /// Partition handling or verification failed on-device.
    Internal,
}

impl core::fmt::Display for OtaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TransferFailed => write!(f, "transfer failed"),
            Self::NoUpdateAvailable => write!(f, "no update available"),
            Self::Internal => write!(f, "internal update error"),
        }
    }
}
