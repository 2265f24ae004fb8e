//! System control adapter.
//!
//! Implements [`SystemPort`]. On ESP-IDF a restart is `esp_restart()`,
//! which never returns. The host build only counts requests.

use log::warn;

use crate::app::ports::SystemPort;

#[derive(Debug, Default)]
pub struct EspSystem {
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
}

impl EspSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart requests seen by the simulated system.
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl SystemPort for EspSystem {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        warn!("SYS | restarting");
        // SAFETY: esp_restart has no preconditions; it does not return.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        warn!("SYS(sim) | restart requested");
        self.restarts += 1;
    }
}
