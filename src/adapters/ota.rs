//! OTA firmware flashing adapter.
//!
//! Implements [`OtaPort`]: streams the image at a URL into the inactive
//! app partition and marks it bootable. The device keeps running the old
//! image until the caller restarts.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: HTTP(S) download via `EspHttpConnection`
//!   chunked straight into `esp-ota`'s partition writer.
//! - **all other targets**: a scripted stub recording what would have been
//!   flashed, for host-side command-flow tests.

use log::info;

use crate::app::ports::{OtaError, OtaPort, OtaTransport};

#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use log::warn;

/// Image downloads are large; allow a generous exchange deadline.
#[cfg(target_os = "espidf")]
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OtaFlasher {
    #[cfg(not(target_os = "espidf"))]
    outcome: Result<(), OtaError>,
    #[cfg(not(target_os = "espidf"))]
    staged: Vec<(String, OtaTransport)>,
}

impl OtaFlasher {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {}
    }

    /// Simulated flasher where every update succeeds.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated() -> Self {
        Self {
            outcome: Ok(()),
            staged: Vec::new(),
        }
    }

    /// Simulated flasher where every update fails with `error`.
    #[cfg(not(target_os = "espidf"))]
    pub fn failing(error: OtaError) -> Self {
        Self {
            outcome: Err(error),
            staged: Vec::new(),
        }
    }

    /// Images that were staged, in order.
    #[cfg(not(target_os = "espidf"))]
    pub fn staged(&self) -> &[(String, OtaTransport)] {
        &self.staged
    }
}

impl OtaPort for OtaFlasher {
    fn apply_from_url(&mut self, url: &str, transport: OtaTransport) -> Result<(), OtaError> {
        #[cfg(target_os = "espidf")]
        {
            use embedded_svc::http::Status as _;
            use embedded_svc::http::client::Client;
            use embedded_svc::io::Read as _;
            use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

            let config = match transport {
                OtaTransport::Tls => Configuration {
                    crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                    timeout: Some(DOWNLOAD_TIMEOUT),
                    ..Default::default()
                },
                OtaTransport::Plain => Configuration {
                    timeout: Some(DOWNLOAD_TIMEOUT),
                    ..Default::default()
                },
            };
            let connection = EspHttpConnection::new(&config).map_err(|e| {
                warn!("OtaFlasher: connection setup failed: {e}");
                OtaError::TransferFailed
            })?;
            let mut client = Client::wrap(connection);

            let request = client.get(url).map_err(|_| OtaError::TransferFailed)?;
            let mut response = request.submit().map_err(|_| OtaError::TransferFailed)?;
            match response.status() {
                200 => {}
                304 => return Err(OtaError::NoUpdateAvailable),
                status => {
                    warn!("OtaFlasher: image server answered {status}");
                    return Err(OtaError::TransferFailed);
                }
            }

            let mut ota = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("OtaFlasher: could not open update partition: {e}");
                OtaError::Internal
            })?;
            let mut written = 0usize;
            let mut chunk = [0u8; 4096];
            loop {
                let n = response.read(&mut chunk).map_err(|_| OtaError::TransferFailed)?;
                if n == 0 {
                    break;
                }
                ota.write(&chunk[..n]).map_err(|_| OtaError::TransferFailed)?;
                written += n;
            }

            let mut completed = ota.finalize().map_err(|e| {
                warn!("OtaFlasher: image did not validate: {e}");
                OtaError::Internal
            })?;
            completed
                .set_as_boot_partition()
                .map_err(|_| OtaError::Internal)?;
            info!("OtaFlasher: staged {written} bytes, boot partition switched");
            Ok(())
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.staged.push((url.to_owned(), transport));
            match self.outcome {
                Ok(()) => {
                    info!("OtaFlasher(sim): staged image from {url}");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
    }
}
