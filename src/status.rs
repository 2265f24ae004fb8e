//! Status / response encoder.
//!
//! Projects live controller state into the JSON payloads the unit
//! publishes. Every call re-reads the controller; nothing is cached.
//!
//! | payload   | shape                                                              |
//! |-----------|--------------------------------------------------------------------|
//! | status    | `{unit_id, status, timestamp, pumps:{"<id>":{active, available, cooldown_remaining, level}}}` |
//! | response  | `{code, message, command_id, success, timestamp, unit_id}`         |
//! | config    | `{unit_id, pumps:{"<id>":{activation_time, cooldown_time}}}`        |
//! | heartbeat | `{unit_id, status:"alive", timestamp, transport_connected, dropped_messages}` |
//! | shadow    | `{state:{reported:{timestamp, unit_id, status:"alive", mqtt_connected}}}` |
//! | error     | `{error_type, message, timestamp, unit_id}`                        |
//! | push      | `{event, data}`, any of the above as a WebSocket event             |
//!
//! Pump maps are emitted in id order.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::command::CommandResponse;
use crate::config::PumpTiming;
use crate::pumps::PumpController;

/// Reported in every status snapshot while the unit is running.
pub const STATUS_READY: &str = "ready";
pub const STATUS_ALIVE: &str = "alive";

/// Reported as every pump's `level`. The outputs are on/off, so no
/// intensity is measured; the field stays for dashboards that read it.
pub const LEVEL_PLACEHOLDER: u8 = 0;

// ───────────────────────────────────────────────────────────────
// Status snapshot
// ───────────────────────────────────────────────────────────────

/// One pump's line in a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PumpStatus {
    pub active: bool,
    pub available: bool,
    pub cooldown_remaining: u32,
    /// Always [`LEVEL_PLACEHOLDER`].
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub unit_id: String,
    pub status: &'static str,
    pub timestamp: u64,
    #[serde(serialize_with = "ordered_pumps")]
    pub pumps: Vec<PumpStatus>,
}

impl StatusReport {
    /// Snapshot every pump in `[0, pump_count)` at `now_ms`.
    pub fn capture(controller: &PumpController, unit_id: &str, now_ms: u64) -> Self {
        let pumps = controller
            .pumps()
            .iter()
            .map(|p| PumpStatus {
                active: p.is_active(),
                available: p.is_available(now_ms),
                cooldown_remaining: p.cooldown_remaining(now_ms),
                level: LEVEL_PLACEHOLDER,
            })
            .collect();
        Self {
            unit_id: unit_id.into(),
            status: STATUS_READY,
            timestamp: now_ms,
            pumps,
        }
    }

    pub fn to_json(&self) -> String {
        to_json(self)
    }
}

// ───────────────────────────────────────────────────────────────
// Response
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ResponsePayload<'a> {
    code: u16,
    message: &'a str,
    command_id: &'a str,
    success: bool,
    timestamp: u64,
    unit_id: &'a str,
}

pub fn response_payload(resp: &CommandResponse, unit_id: &str) -> String {
    to_json(&ResponsePayload {
        code: resp.code.as_u16(),
        message: &resp.message,
        command_id: &resp.command_id,
        success: resp.success(),
        timestamp: resp.timestamp,
        unit_id,
    })
}

// ───────────────────────────────────────────────────────────────
// Pump configuration
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PumpConfigEntry {
    activation_time: u32,
    cooldown_time: u32,
}

impl From<PumpTiming> for PumpConfigEntry {
    fn from(t: PumpTiming) -> Self {
        Self {
            activation_time: t.activation_ms,
            cooldown_time: t.cooldown_ms,
        }
    }
}

#[derive(Serialize)]
struct ConfigPayload<'a> {
    unit_id: &'a str,
    #[serde(serialize_with = "ordered_pumps")]
    pumps: Vec<PumpConfigEntry>,
}

/// Current per-pump timings.
pub fn config_payload(controller: &PumpController, unit_id: &str) -> String {
    to_json(&ConfigPayload {
        unit_id,
        pumps: controller
            .pumps()
            .iter()
            .map(|p| PumpConfigEntry::from(p.timing()))
            .collect(),
    })
}

// ───────────────────────────────────────────────────────────────
// Heartbeat
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Heartbeat<'a> {
    unit_id: &'a str,
    status: &'static str,
    timestamp: u64,
    transport_connected: bool,
    dropped_messages: u32,
}

/// Reported state of the AWS IoT device shadow. Field names are read by
/// existing shadow consumers.
#[derive(Serialize)]
struct ShadowHeartbeat<'a> {
    timestamp: u64,
    unit_id: &'a str,
    status: &'static str,
    mqtt_connected: bool,
}

#[derive(Serialize)]
struct ShadowState<T> {
    reported: T,
}

#[derive(Serialize)]
struct ShadowUpdate<T> {
    state: ShadowState<T>,
}

/// Liveness beacon. `dropped_messages` counts mailbox drops since boot.
pub fn heartbeat_payload(
    unit_id: &str,
    now_ms: u64,
    transport_connected: bool,
    dropped_messages: u32,
) -> String {
    to_json(&Heartbeat {
        unit_id,
        status: STATUS_ALIVE,
        timestamp: now_ms,
        transport_connected,
        dropped_messages,
    })
}

/// Heartbeat as an AWS IoT device shadow update.
pub fn shadow_heartbeat_payload(unit_id: &str, now_ms: u64, mqtt_connected: bool) -> String {
    to_json(&ShadowUpdate {
        state: ShadowState {
            reported: ShadowHeartbeat {
                timestamp: now_ms,
                unit_id,
                status: STATUS_ALIVE,
                mqtt_connected,
            },
        },
    })
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error_type: &'a str,
    message: &'a str,
    timestamp: u64,
    unit_id: &'a str,
}

pub fn error_payload(error_type: &str, message: &str, now_ms: u64, unit_id: &str) -> String {
    to_json(&ErrorPayload {
        error_type,
        message,
        timestamp: now_ms,
        unit_id,
    })
}

// ───────────────────────────────────────────────────────────────
// WebSocket push
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PushFrame<'a> {
    event: &'a str,
    data: Value,
}

/// Wrap an outbound payload as a WebSocket event named `event`. A payload
/// that is not JSON is pushed as `null`.
pub fn push_frame(event: &str, payload: &str) -> String {
    to_json(&PushFrame {
        event,
        data: serde_json::from_str(payload).unwrap_or(Value::Null),
    })
}

// ───────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────

/// Serialize a per-pump list as `{"0": .., "1": .., ...}` in id order.
fn ordered_pumps<S, T>(pumps: &[T], s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut map = s.serialize_map(Some(pumps.len()))?;
    for (id, pump) in pumps.iter().enumerate() {
        map.serialize_entry(&id.to_string(), pump)?;
    }
    map.end()
}

/// These payloads contain only strings, integers and bools, which always
/// encode.
fn to_json(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
