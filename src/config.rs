//! Device configuration parameters.
//!
//! [`DeviceConfig`] describes the unit itself (identity, pump wiring,
//! default timings, loop cadence). [`NetworkConfig`] describes how the unit
//! reaches its director. Both are loaded once at boot through the
//! [`ConfigPort`](crate::app::ports::ConfigPort); runtime pump timing changes
//! made by `set_pump_config` live only in the controller and are lost on
//! power cycle.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigPort;
use crate::pins;

/// Hard upper bound on pumps per unit.
pub const MAX_PUMPS: usize = 8;

/// Unit identifier (`osmo_norte`, `OSMO-EFCAFE`, ...).
pub type UnitId = heapless::String<32>;

/// Activation / cooldown pair for one pump, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpTiming {
    /// How long the output stays on once triggered.
    pub activation_ms: u32,
    /// Minimum idle time after switch-off before the pump may run again.
    pub cooldown_ms: u32,
}

impl Default for PumpTiming {
    fn default() -> Self {
        Self {
            activation_ms: 2000,
            cooldown_ms: 3000,
        }
    }
}

/// Core device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unit id reported in every payload. Empty means "derive from MAC".
    pub unit_id: UnitId,
    /// Number of pumps wired to this unit (1..=MAX_PUMPS).
    pub pump_count: u8,
    /// GPIO number per pump, index = pump id.
    pub pump_pins: heapless::Vec<i32, MAX_PUMPS>,
    /// Factory timings restored by `reset_config`.
    pub pump_defaults: PumpTiming,
    /// Pump outputs switch on by driving the pin LOW.
    pub outputs_active_low: bool,
    /// On-board LED flashed on every inbound message (active-low).
    pub activity_led_pin: i32,

    // --- Timing ---
    /// Periodic status publish interval (milliseconds).
    pub status_interval_ms: u32,
    /// Periodic heartbeat publish interval (milliseconds).
    pub heartbeat_interval_ms: u32,
    /// Control loop poll interval (milliseconds). Bounds pump timing accuracy.
    pub control_loop_interval_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut pump_pins = heapless::Vec::new();
        for pin in pins::DEFAULT_PUMP_GPIOS {
            // DEFAULT_PUMP_GPIOS is shorter than MAX_PUMPS.
            let _ = pump_pins.push(pin);
        }
        Self {
            unit_id: UnitId::new(),
            pump_count: pins::DEFAULT_PUMP_GPIOS.len() as u8,
            pump_pins,
            pump_defaults: PumpTiming::default(),
            outputs_active_low: false,
            activity_led_pin: pins::ACTIVITY_LED_GPIO,

            status_interval_ms: 10_000,    // 0.1 Hz
            heartbeat_interval_ms: 60_000, // 1/min
            control_loop_interval_ms: 50,  // 20 Hz
        }
    }
}

impl DeviceConfig {
    /// Range-check every field. Returns the first offending field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !is_printable_ascii(&self.unit_id) {
            return Err("unit_id must be printable ASCII");
        }
        if self.pump_count == 0 || self.pump_count as usize > MAX_PUMPS {
            return Err("pump_count must be 1–8");
        }
        if self.pump_pins.len() < self.pump_count as usize {
            return Err("pump_pins must list one GPIO per pump");
        }
        if !(1_000..=300_000).contains(&self.pump_defaults.activation_ms) {
            return Err("pump_defaults.activation_ms must be 1000–300000");
        }
        if !(1_000..=300_000).contains(&self.pump_defaults.cooldown_ms) {
            return Err("pump_defaults.cooldown_ms must be 1000–300000");
        }
        if !(1_000..=3_600_000).contains(&self.status_interval_ms) {
            return Err("status_interval_ms must be 1000–3600000");
        }
        if !(5_000..=3_600_000).contains(&self.heartbeat_interval_ms) {
            return Err("heartbeat_interval_ms must be 5000–3600000");
        }
        if !(10..=100).contains(&self.control_loop_interval_ms) {
            return Err("control_loop_interval_ms must be 10–100");
        }
        Ok(())
    }

    /// Pins of the pumps actually in use, index = pump id.
    pub fn active_pins(&self) -> &[i32] {
        let n = (self.pump_count as usize).min(self.pump_pins.len());
        &self.pump_pins[..n]
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Which link carries commands and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Plain MQTT broker on the LAN.
    Mqtt,
    /// AWS IoT Core (MQTT over TLS, client certificates).
    AwsIot,
    /// Embedded HTTP server, commands via `POST /api/command/<unit>`.
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Give up on association after this long and continue offline.
    pub wifi_connect_timeout_ms: u32,

    pub transport: TransportKind,
    /// Broker URL, e.g. `mqtt://192.168.1.34:1883` or `mqtts://xxx.iot...:8883`.
    pub broker_url: heapless::String<96>,
    pub client_id: heapless::String<32>,
    pub username: heapless::String<32>,
    pub password: heapless::String<64>,
    /// 0 = at most once, 1 = at least once, 2 = exactly once.
    pub qos: u8,
    pub keep_alive_secs: u16,
    pub clean_session: bool,
    /// Fixed delay between broker reconnect attempts.
    pub reconnect_delay_ms: u32,
    /// AWS IoT thing name; selects the `$aws/things/...` topics.
    pub aws_thing_name: heapless::String<64>,

    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            wifi_connect_timeout_ms: 20_000,

            transport: TransportKind::Mqtt,
            broker_url: heapless::String::new(),
            client_id: heapless::String::new(),
            username: heapless::String::new(),
            password: heapless::String::new(),
            qos: 1,
            keep_alive_secs: 60,
            clean_session: true,
            reconnect_delay_ms: 5_000,
            aws_thing_name: heapless::String::new(),

            http_port: 80,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.qos > 2 {
            return Err("qos must be 0–2");
        }
        if !(1_000..=60_000).contains(&self.reconnect_delay_ms) {
            return Err("reconnect_delay_ms must be 1000–60000");
        }
        if self.transport == TransportKind::AwsIot && self.aws_thing_name.is_empty() {
            return Err("aws_thing_name is required for AWS IoT");
        }
        if self.transport != TransportKind::Http && self.broker_url.is_empty() {
            return Err("broker_url is required for MQTT transports");
        }
        Ok(())
    }
}

/// Load both configurations from `store`. A record that is missing,
/// corrupted or out of range is replaced by its defaults.
pub fn load_or_default(store: &impl ConfigPort) -> (DeviceConfig, NetworkConfig) {
    let device = store.load().unwrap_or_else(|e| {
        warn!("CONFIG | device config unusable ({}), using defaults", e);
        DeviceConfig::default()
    });
    let network = store.load_network().unwrap_or_else(|e| {
        warn!("CONFIG | network config unusable ({}), using defaults", e);
        NetworkConfig::default()
    });
    (device, network)
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
