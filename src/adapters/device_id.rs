//! Unit identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable id in the form `OSMO-XXYYZZ`
//! (last 3 bytes of the 6-byte MAC in uppercase hex). Used as the unit id
//! whenever none is provisioned, and therefore in every MQTT topic and
//! payload.

use crate::config::UnitId;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the short unit id from the last 3 MAC bytes.
/// Format: `OSMO-XXYYZZ` (e.g., `OSMO-EFCAFE`).
pub fn unit_id(mac: &MacAddress) -> UnitId {
    let mut id = UnitId::new();
    use core::fmt::Write;
    let _ = write!(id, "OSMO-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// The provisioned id if there is one, otherwise the MAC-derived id.
pub fn resolve_unit_id(provisioned: &str, mac: &MacAddress) -> UnitId {
    let trimmed = provisioned.trim();
    if trimmed.is_empty() {
        return unit_id(mac);
    }
    UnitId::try_from(trimmed).unwrap_or_else(|()| unit_id(mac))
}
