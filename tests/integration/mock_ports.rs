//! Mock ports for integration tests.
//!
//! Scripted HTTP replies, a recording event sink and a fixed-output
//! sensor sampler. WiFi and flash are covered by the crate's own
//! simulation adapters, so only the cloud side needs mocking here.

use std::collections::VecDeque;

use greenlink::adapters::flash::{CONFIG_REGION_LEN, FlashRegion};
use greenlink::app::events::AppEvent;
use greenlink::app::ports::{
    EventSink, HttpError, HttpPort, HttpResponse, Measurement, MeasurementChannel, SensorPort,
};
use greenlink::cloud::SyncClient;
use greenlink::config::{SensorKind, SensorSlot};
use greenlink::store::ConfigStore;

// ── Captured request ──────────────────────────────────────────

#[derive(Debug)]
pub struct Request {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl Request {
    /// Final path segment, which is the RPC function name.
    pub fn endpoint(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or("")
    }
}

// ── ScriptedHttp ──────────────────────────────────────────────

/// HTTP port replaying one scripted reply per request and recording
/// everything that went over the wire. An unscripted request fails with
/// [`HttpError::ConnectFailed`].
#[derive(Default)]
pub struct ScriptedHttp {
    replies: VecDeque<Result<HttpResponse, HttpError>>,
    pub requests: Vec<Request>,
}

#[allow(dead_code)]
impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&mut self, status: u16, body: &str) {
        self.replies.push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn push_err(&mut self, error: HttpError) {
        self.replies.push_back(Err(error));
    }

    pub fn requests_to(&self, endpoint: &str) -> Vec<&Request> {
        self.requests
            .iter()
            .filter(|r| r.endpoint() == endpoint)
            .collect()
    }
}

impl HttpPort for ScriptedHttp {
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<HttpResponse, HttpError> {
        self.requests.push(Request {
            url: url.to_owned(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            body: serde_json::from_slice(body).unwrap(),
        });
        self.replies
            .pop_front()
            .unwrap_or(Err(HttpError::ConnectFailed))
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink keeping every emitted event for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── FixedSensors ──────────────────────────────────────────────

/// Deterministic sampler: DHT slots read 21.5 °C / 48 %, analog slots a
/// fixed percentage, so telemetry assertions are exact.
pub struct FixedSensors;

impl SensorPort for FixedSensors {
    fn sample(&mut self, slot: &SensorSlot) -> heapless::Vec<Measurement, 2> {
        let mut out = heapless::Vec::new();
        match slot.kind {
            SensorKind::Dht22 | SensorKind::Dht11 => {
                let _ = out.push(Measurement {
                    channel: MeasurementChannel::Temperature,
                    value: 21.5,
                });
                let _ = out.push(Measurement {
                    channel: MeasurementChannel::Humidity,
                    value: 48.0,
                });
            }
            SensorKind::SoilMoisture => {
                let _ = out.push(Measurement {
                    channel: MeasurementChannel::SoilMoisture,
                    value: 40.0,
                });
            }
            SensorKind::WaterLevel => {
                let _ = out.push(Measurement {
                    channel: MeasurementChannel::WaterLevel,
                    value: 70.0,
                });
            }
            SensorKind::None => {}
        }
        out
    }
}

// ── Shared fixtures ───────────────────────────────────────────

pub fn test_client() -> SyncClient {
    SyncClient::new("https://cloud.example", "test-key")
}

/// Store on in-memory flash, provisioned as `GH-A1` on `greenhouse`.
pub fn provisioned_store() -> ConfigStore<FlashRegion> {
    let mut store = ConfigStore::new(FlashRegion::in_memory(CONFIG_REGION_LEN));
    store
        .provision("GH-A1", "greenhouse", "old-passphrase")
        .unwrap();
    store
}
