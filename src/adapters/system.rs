//! Platform control: restart.
//!
//! Commands and fatal network states end in a reboot. On the device this
//! is `esp_restart`; the simulation exits the process so scripted runs
//! terminate cleanly.

use log::warn;

/// Reboot the device. Does not return.
pub fn restart() -> ! {
    #[cfg(target_os = "espidf")]
    {
        warn!("restarting");
        // SAFETY: esp_restart has no preconditions; it never returns.
        unsafe { esp_idf_svc::sys::esp_restart() };
        unreachable!("esp_restart does not return")
    }

    #[cfg(not(target_os = "espidf"))]
    {
        warn!("restart requested, leaving simulation");
        std::process::exit(0)
    }
}
