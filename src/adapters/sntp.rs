//! NTP clock sync ahead of AWS IoT.
//!
//! The AWS IoT TLS handshake checks certificate validity against wall-clock
//! time, and the ESP32 boots at the epoch. [`sync_clock`] starts SNTP and
//! waits a bounded time for the first sync. A unit that cannot reach an
//! NTP server still tries to connect; the MQTT client keeps retrying while
//! SNTP keeps syncing in the background.

use log::{info, warn};

/// Sync checks made before connecting anyway.
pub const SYNC_ATTEMPTS: u32 = 20;

/// Pause between sync checks.
pub const SYNC_POLL_MS: u64 = 500;

/// Check `synced` up to `attempts` times, calling `pause` between checks.
/// Returns `true` as soon as the clock is synced.
pub fn wait_for_sync(
    mut synced: impl FnMut() -> bool,
    attempts: u32,
    mut pause: impl FnMut(),
) -> bool {
    for n in 1..=attempts {
        if synced() {
            info!("SNTP | clock synced after {} check(s)", n);
            return true;
        }
        if n < attempts {
            pause();
        }
    }
    warn!("SNTP | clock not synced after {} checks, connecting anyway", attempts);
    false
}

#[cfg(target_os = "espidf")]
pub use esp::sync_clock;

#[cfg(target_os = "espidf")]
mod esp {
    use core::time::Duration;

    use esp_idf_svc::sntp::{EspSntp, SyncStatus};

    use super::{SYNC_ATTEMPTS, SYNC_POLL_MS, wait_for_sync};

    /// Start SNTP and wait for the first sync. Keep the returned handle
    /// alive so the clock stays synced.
    pub fn sync_clock() -> anyhow::Result<EspSntp<'static>> {
        let sntp = EspSntp::new_default()?;
        wait_for_sync(
            || sntp.get_sync_status() == SyncStatus::Completed,
            SYNC_ATTEMPTS,
            || std::thread::sleep(Duration::from_millis(SYNC_POLL_MS)),
        );
        Ok(sntp)
    }
}
