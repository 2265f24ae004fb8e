//! Per-action validation rules.
//!
//! | action            | rule                                                    |
//! |-------------------|---------------------------------------------------------|
//! | `activate_pump`   | pump id in range; `duration` in 100–60000 ms if given   |
//! | `deactivate_pump` | pump id in range                                        |
//! | `set_pump_config` | pump id in range; both times in 1000–300000 ms          |
//! | everything else   | always valid                                            |
//!
//! A `pump_id` that is not an integer (string, float, bool, null) is a
//! malformed request (400). An integer outside the pump range, including
//! one too large for `i32`, is "pump not found" (404). Any other params
//! decoding failure is "invalid parameters" (422).
//!
//! Validation never touches the controller, so a rejected command has no
//! side effects.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CommandError;
use crate::pumps::PumpId;

use super::params::{self, PumpActivationParams, PumpConfigParams};
use super::{Action, Command};

pub const MIN_PUMP_ID: i32 = 0;
/// Highest pump id on the standard four-pump board.
pub const MAX_PUMP_ID: i32 = 3;

pub const MIN_DURATION_MS: u32 = 100;
pub const MAX_DURATION_MS: u32 = 60_000;

pub const MIN_CONFIG_TIME_MS: u32 = 1_000;
pub const MAX_CONFIG_TIME_MS: u32 = 300_000;

/// A command that passed validation, with its params decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidCommand {
    ActivatePump {
        pump_id: PumpId,
        duration_ms: Option<u32>,
        force: bool,
    },
    DeactivatePump {
        pump_id: PumpId,
    },
    GetStatus,
    SetPumpConfig {
        pump_id: PumpId,
        activation_ms: u32,
        cooldown_ms: u32,
    },
    Reboot,
    ResetConfig,
    Heartbeat,
}

impl ValidCommand {
    pub fn action(&self) -> Action {
        match self {
            Self::ActivatePump { .. } => Action::ActivatePump,
            Self::DeactivatePump { .. } => Action::DeactivatePump,
            Self::GetStatus => Action::GetStatus,
            Self::SetPumpConfig { .. } => Action::SetPumpConfig,
            Self::Reboot => Action::Reboot,
            Self::ResetConfig => Action::ResetConfig,
            Self::Heartbeat => Action::Heartbeat,
        }
    }
}

/// Validation rules bound to a pump id range `[MIN_PUMP_ID, max_pump_id]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    max_pump_id: i32,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_pump_id: MAX_PUMP_ID,
        }
    }
}

impl Validator {
    /// Rules for a unit with `pump_count` pumps (ids `0..pump_count`).
    pub fn for_pump_count(pump_count: usize) -> Self {
        Self {
            max_pump_id: pump_count as i32 - 1,
        }
    }

    pub fn max_pump_id(&self) -> i32 {
        self.max_pump_id
    }

    pub fn validate(&self, cmd: &Command) -> Result<ValidCommand, CommandError> {
        if cmd.is_parse_failure() {
            return Err(CommandError::ParseFailure);
        }
        let action = cmd.action().ok_or(CommandError::UnrecognizedCommand)?;

        match action {
            Action::ActivatePump => {
                let p: PumpActivationParams = decode_pump_params(&cmd.params)?;
                let pump_id = self.pump_id(p.pump_id)?;
                if let Some(d) = p.duration_ms {
                    if !(MIN_DURATION_MS..=MAX_DURATION_MS).contains(&d) {
                        return Err(CommandError::InvalidParams);
                    }
                }
                Ok(ValidCommand::ActivatePump {
                    pump_id,
                    duration_ms: p.duration_ms,
                    force: p.force,
                })
            }
            Action::DeactivatePump => {
                let p: PumpActivationParams = decode_pump_params(&cmd.params)?;
                Ok(ValidCommand::DeactivatePump {
                    pump_id: self.pump_id(p.pump_id)?,
                })
            }
            Action::SetPumpConfig => {
                let p: PumpConfigParams = decode_pump_params(&cmd.params)?;
                let pump_id = self.pump_id(p.pump_id)?;
                let in_range =
                    |t: Option<u32>| t.filter(|t| (MIN_CONFIG_TIME_MS..=MAX_CONFIG_TIME_MS).contains(t));
                match (in_range(p.activation_time), in_range(p.cooldown_time)) {
                    (Some(activation_ms), Some(cooldown_ms)) => Ok(ValidCommand::SetPumpConfig {
                        pump_id,
                        activation_ms,
                        cooldown_ms,
                    }),
                    _ => Err(CommandError::InvalidParams),
                }
            }
            Action::GetStatus => Ok(ValidCommand::GetStatus),
            Action::Reboot => Ok(ValidCommand::Reboot),
            Action::ResetConfig => Ok(ValidCommand::ResetConfig),
            Action::Heartbeat => Ok(ValidCommand::Heartbeat),
        }
    }

    fn pump_id(&self, id: i32) -> Result<PumpId, CommandError> {
        if (MIN_PUMP_ID..=self.max_pump_id).contains(&id) {
            Ok(id as PumpId)
        } else {
            Err(CommandError::PumpNotFound)
        }
    }
}

/// Decode the params of a pump-scoped action, classifying `pump_id`
/// before the typed decode can lump it in with other failures.
fn decode_pump_params<T: DeserializeOwned>(params: &str) -> Result<T, CommandError> {
    let doc: Value = params::decode(params).map_err(|_| CommandError::InvalidParams)?;
    if let Some(id) = doc.get("pump_id") {
        if !(id.is_i64() || id.is_u64()) {
            return Err(CommandError::MalformedPumpId);
        }
        if id.as_i64().and_then(|i| i32::try_from(i).ok()).is_none() {
            return Err(CommandError::PumpNotFound);
        }
    }
    serde_json::from_value(doc).map_err(|_| CommandError::InvalidParams)
}

/// Validate against the standard four-pump board.
pub fn validate(cmd: &Command) -> Result<ValidCommand, CommandError> {
    Validator::default().validate(cmd)
}

/// Boolean form of [`validate`].
pub fn validate_command(cmd: &Command) -> bool {
    validate(cmd).is_ok()
}
