//! Firmware update orchestration.
//!
//! Picks the transport from the image URL scheme and hands the download to
//! the OTA port. Success means the new image is staged; it only becomes the
//! running firmware after the restart the command layer schedules. The cloud
//! confirms the flash from the version reported by the next heartbeat.

use log::{error, info, warn};

use crate::app::ports::{OtaError, OtaPort, OtaTransport};

/// Download and stage the image at `url`.
pub fn perform<O: OtaPort>(ota: &mut O, url: &str, version: &str) -> Result<(), OtaError> {
    let transport = if url.starts_with("https://") {
        OtaTransport::Tls
    } else {
        OtaTransport::Plain
    };
    info!("firmware update to {version} from {url} ({transport})");
    match ota.apply_from_url(url, transport) {
        Ok(()) => {
            info!("firmware image staged, restart will boot {version}");
            Ok(())
        }
        Err(OtaError::NoUpdateAvailable) => {
            warn!("update server reports no image for this device");
            Err(OtaError::NoUpdateAvailable)
        }
        Err(e) => {
            error!("firmware update failed: {e}");
            Err(e)
        }
    }
}
