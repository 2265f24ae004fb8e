//! Action-specific parameter objects.
//!
//! A pump id that is absent defaults to `-1`, which validation reports as
//! "pump not found" rather than "invalid parameters".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn missing_pump_id() -> i32 {
    -1
}

/// Params of `activate_pump` / `deactivate_pump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpActivationParams {
    #[serde(default = "missing_pump_id")]
    pub pump_id: i32,
    /// One-off activation length; the configured time is used when absent.
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub force: bool,
}

impl PumpActivationParams {
    pub fn pump(pump_id: i32) -> Self {
        Self {
            pump_id,
            duration_ms: None,
            force: false,
        }
    }
}

/// Params of `set_pump_config`. Both times are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpConfigParams {
    #[serde(default = "missing_pump_id")]
    pub pump_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_time: Option<u32>,
}

/// Decode a params blob. An empty blob decodes like `{}`.
pub fn decode<T: DeserializeOwned>(params: &str) -> Result<T, serde_json::Error> {
    let params = if params.trim().is_empty() { "{}" } else { params };
    serde_json::from_str(params)
}

/// Encode params in the canonical form produced by
/// [`parse_command`](super::parse_command).
pub fn encode(params: &impl Serialize) -> String {
    serde_json::to_value(params)
        .map(|v| v.to_string())
        .unwrap_or_default()
}
