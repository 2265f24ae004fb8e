//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full output
//! history without touching real GPIO registers.

use osmo::app::events::AppEvent;
use osmo::app::ports::{ActuatorPort, ConfigError, ConfigPort, EventSink, SystemPort};
use osmo::config::{DeviceConfig, NetworkConfig};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    SetPump { pump_id: usize, on: bool },
    AllOff,
    Flash { at_ms: u64 },
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    pub fn last_call(&self) -> Option<&ActuatorCall> {
        self.calls.last()
    }

    /// Current output level of `pump_id`, replayed from the call history.
    pub fn pump_on(&self, pump_id: usize) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::SetPump { pump_id: id, on } if *id == pump_id => Some(*on),
                ActuatorCall::AllOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn pump_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::SetPump { .. }))
            .count()
    }

    pub fn flashes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::Flash { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set_pump_output(&mut self, pump_id: usize, on: bool) {
        self.calls.push(ActuatorCall::SetPump { pump_id, on });
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }

    fn flash_activity(&mut self, now_ms: u64) {
        self.calls.push(ActuatorCall::Flash { at_ms: now_ms });
    }

    fn update_indicators(&mut self, _now_ms: u64) {}
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockSystem ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSystem {
    pub restarts: u32,
}

impl SystemPort for MockSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// ── MockConfigStore ───────────────────────────────────────────

/// Config store that always answers with a fixed result.
#[allow(dead_code)]
pub struct MockConfigStore {
    pub device: Result<DeviceConfig, ConfigError>,
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        self.device.clone()
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)
    }

    fn load_network(&self) -> Result<NetworkConfig, ConfigError> {
        Ok(NetworkConfig::default())
    }
}
