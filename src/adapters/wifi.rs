//! WiFi station-mode adapter.
//!
//! Brings the station interface up once at boot. The unit keeps running
//! offline if association does not complete within
//! `wifi_connect_timeout_ms`; the link layer then simply never connects.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::fmt;
use log::{info, warn};

use crate::config::NetworkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    Timeout,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::Timeout => write!(f, "WiFi association timed out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Check the station credentials in `net` without touching the radio.
pub fn validate_credentials(net: &NetworkConfig) -> Result<(), ConnectivityError> {
    validate_ssid(&net.wifi_ssid)?;
    validate_password(&net.wifi_password)
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
        Ok(Self {
            state: WifiState::Disconnected,
            wifi,
        })
    }

    fn platform_connect(&mut self, net: &NetworkConfig) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if net.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: net
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: net
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .start()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;

        let timeout = std::time::Duration::from_millis(u64::from(net.wifi_connect_timeout_ms));
        let started = std::time::Instant::now();
        if let Err(e) = self.wifi.wifi_mut().connect() {
            warn!("WiFi: connect request failed: {:?}", e);
            return Err(ConnectivityError::ConnectionFailed);
        }
        while !self.wifi.is_connected().unwrap_or(false) {
            if started.elapsed() > timeout {
                return Err(ConnectivityError::Timeout);
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        self.wifi
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: IP {}", ip.ip);
        }
        Ok(())
    }

    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
        }
    }

    fn platform_connect(&mut self, net: &NetworkConfig) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): connected to '{}'", net.wifi_ssid);
        Ok(())
    }

    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    /// Associate with the configured access point, blocking for at most
    /// `wifi_connect_timeout_ms`.
    pub fn connect(&mut self, net: &NetworkConfig) -> Result<(), ConnectivityError> {
        if let Err(e) = validate_credentials(net) {
            self.state = WifiState::Failed;
            return Err(e);
        }
        info!("WiFi: connecting to '{}'", net.wifi_ssid);
        match self.platform_connect(net) {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                warn!("WiFi: {}, continuing offline", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }
}
