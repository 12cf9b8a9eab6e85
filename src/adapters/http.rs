//! Blocking HTTP client adapter.
//!
//! Implements [`HttpPort`] for the JSON control-plane exchanges. Each call
//! opens a fresh connection, sends one POST and buffers the full response;
//! the bodies on this path are small JSON documents, so there is no
//! streaming. Firmware images go through the OTA adapter instead.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` with the ESP-IDF
//!   certificate bundle for TLS.
//! - **all other targets**: there is no cloud in simulation; every request
//!   fails with [`HttpError::ConnectFailed`]. Host tests script responses
//!   through their own [`HttpPort`] mocks instead.

use log::debug;

use crate::app::ports::{HttpError, HttpPort, HttpResponse};

#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use log::warn;

/// Deadline for one request/response exchange.
#[cfg(target_os = "espidf")]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClient;

impl HttpClient {
    pub fn new() -> Self {
        Self
    }
}

impl HttpPort for HttpClient {
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<HttpResponse, HttpError> {
        #[cfg(target_os = "espidf")]
        {
            use embedded_svc::http::Status as _;
            use embedded_svc::http::client::Client;
            use embedded_svc::io::{Read as _, Write as _};
            use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

            let connection = EspHttpConnection::new(&Configuration {
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                timeout: Some(REQUEST_TIMEOUT),
                ..Default::default()
            })
            .map_err(|e| {
                warn!("HttpClient: connection setup failed: {e}");
                HttpError::ConnectFailed
            })?;
            let mut client = Client::wrap(connection);

            let mut request = client.post(url, headers).map_err(|e| {
                warn!("HttpClient: POST {url} failed: {e}");
                HttpError::RequestFailed
            })?;
            request.write_all(body).map_err(|_| HttpError::RequestFailed)?;
            let mut response = request.submit().map_err(|_| HttpError::RequestFailed)?;

            let status = response.status();
            let mut buffered = Vec::new();
            let mut chunk = [0u8; 512];
            loop {
                let n = response.read(&mut chunk).map_err(|_| HttpError::ReadFailed)?;
                if n == 0 {
                    break;
                }
                buffered.extend_from_slice(&chunk[..n]);
            }
            debug!("HttpClient: POST {url} -> {status} ({} bytes)", buffered.len());
            Ok(HttpResponse {
                status,
                body: buffered,
            })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let _ = (headers, body);
            debug!("HttpClient(sim): no cloud reachable for POST {url}");
            Err(HttpError::ConnectFailed)
        }
    }
}
