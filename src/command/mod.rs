//! Command model — wire payloads in, typed commands and responses out.
//!
//! ```text
//!   raw JSON ──parse_command──▶ Command ──validate──▶ ValidCommand ──▶ AppService
//!                                  │                      │
//!                                  └──── CommandError ────┴──▶ CommandResponse
//! ```
//!
//! Everything here is a pure function over strings and structs. The
//! controller is only touched by the dispatcher in
//! [`AppService`](crate::app::service::AppService), and only after
//! [`validate`] has accepted the command.

pub mod params;
pub mod response;
pub mod validate;

use serde::Serialize;
use serde_json::{Map, Value};

pub use params::{PumpActivationParams, PumpConfigParams};
pub use response::{CommandResponse, ResponseCode};
pub use validate::{ValidCommand, Validator, validate, validate_command};

// ───────────────────────────────────────────────────────────────
// Actions
// ───────────────────────────────────────────────────────────────

/// The fixed set of actions a director may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ActivatePump,
    DeactivatePump,
    GetStatus,
    SetPumpConfig,
    Reboot,
    ResetConfig,
    Heartbeat,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::ActivatePump,
        Action::DeactivatePump,
        Action::GetStatus,
        Action::SetPumpConfig,
        Action::Reboot,
        Action::ResetConfig,
        Action::Heartbeat,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivatePump => "activate_pump",
            Self::DeactivatePump => "deactivate_pump",
            Self::GetStatus => "get_status",
            Self::SetPumpConfig => "set_pump_config",
            Self::Reboot => "reboot",
            Self::ResetConfig => "reset_config",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

// ───────────────────────────────────────────────────────────────
// Command
// ───────────────────────────────────────────────────────────────

/// One inbound command, as extracted from the wire.
///
/// `action` is kept as received so an unknown action can still be answered
/// with its own command id. An empty `action` means the payload could not
/// be parsed at all. `params` is the action-specific object re-serialized
/// as compact JSON, or empty when the payload carried none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub command_id: String,
    pub action: String,
    pub params: String,
    pub timestamp: u64,
}

impl Command {
    /// Build a command whose params are `params` encoded as JSON.
    pub fn with_params(
        command_id: &str,
        action: Action,
        params: &impl Serialize,
        timestamp: u64,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            action: action.as_str().into(),
            params: params::encode(params),
            timestamp,
        }
    }

    /// Build a command that carries no params.
    pub fn bare(command_id: &str, action: Action, timestamp: u64) -> Self {
        Self {
            command_id: command_id.into(),
            action: action.as_str().into(),
            params: String::new(),
            timestamp,
        }
    }

    /// True if the payload was not a JSON object with an `action`.
    pub fn is_parse_failure(&self) -> bool {
        self.action.is_empty()
    }

    pub fn action(&self) -> Option<Action> {
        Action::parse(&self.action)
    }
}

/// Extract a [`Command`] from a raw payload.
///
/// Never fails: malformed input yields a command with an empty `action`,
/// which callers must answer with an error response instead of
/// dispatching. Fields of the wrong type are treated as absent.
pub fn parse_command(raw: &str) -> Command {
    let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(raw) else {
        return Command::default();
    };

    let text = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_default()
    };

    Command {
        command_id: text("command_id"),
        action: text("action"),
        params: doc
            .get("params")
            .and_then(|p| serde_json::to_string(p).ok())
            .unwrap_or_default(),
        timestamp: doc.get("timestamp").and_then(Value::as_u64).unwrap_or(0),
    }
}

/// Encode a [`Command`] back into its wire form.
///
/// `params` that are not valid JSON are sent as a JSON string so the
/// output is always well-formed.
pub fn serialize_command(cmd: &Command) -> String {
    let mut doc = Map::new();
    doc.insert("command_id".into(), Value::from(cmd.command_id.as_str()));
    doc.insert("action".into(), Value::from(cmd.action.as_str()));
    if !cmd.params.is_empty() {
        let params = serde_json::from_str::<Value>(&cmd.params)
            .unwrap_or_else(|_| Value::from(cmd.params.as_str()));
        doc.insert("params".into(), params);
    }
    doc.insert("timestamp".into(), Value::from(cmd.timestamp));
    Value::Object(doc).to_string()
}
