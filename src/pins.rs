//! GPIO assignments for the Osmo pump board.
//!
//! Single source of truth for the factory wiring. A provisioned
//! [`DeviceConfig`](crate::config::DeviceConfig) may override the pump pins;
//! everything else is fixed by the board.

// ---------------------------------------------------------------------------
// Pump outputs (MOSFET low-side switches, active HIGH)
// ---------------------------------------------------------------------------

/// Pump 0..3 outputs. GPIO 12–15 are safe at boot on both ESP8266 and ESP32.
pub const DEFAULT_PUMP_GPIOS: [i32; 4] = [12, 13, 14, 15];

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// On-board blue LED. Active LOW.
pub const ACTIVITY_LED_GPIO: i32 = 2;

/// How long the activity LED stays lit per inbound message.
pub const ACTIVITY_FLASH_MS: u64 = 100;
