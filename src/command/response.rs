//! Response codes and the per-command response record.

use core::fmt;

use crate::error::CommandError;

use super::Action;

/// HTTP-flavoured result codes carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ResponseCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    UnprocessableEntity = 422,
    Locked = 423,
    ServiceUnavailable = 503,
}

impl ResponseCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// `200 <= code < 300`.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl From<CommandError> for ResponseCode {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::PumpNotFound => Self::NotFound,
            CommandError::PumpBusy => Self::Locked,
            CommandError::InvalidParams => Self::UnprocessableEntity,
            CommandError::MalformedPumpId
            | CommandError::UnrecognizedCommand
            | CommandError::ParseFailure => Self::BadRequest,
        }
    }
}

/// Exactly one of these is produced per dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub code: ResponseCode,
    pub message: String,
    pub command_id: String,
    pub timestamp: u64,
}

impl CommandResponse {
    pub fn new(code: ResponseCode, message: &str, command_id: &str, timestamp: u64) -> Self {
        Self {
            code,
            message: message.into(),
            command_id: command_id.into(),
            timestamp,
        }
    }

    /// Success response with the action's standard message.
    pub fn ok(action: Action, command_id: &str, timestamp: u64) -> Self {
        Self::new(ResponseCode::Ok, success_message(action), command_id, timestamp)
    }

    /// Failure response for a rejected command.
    pub fn rejected(err: CommandError, command_id: &str, timestamp: u64) -> Self {
        Self::new(err.into(), error_message(err), command_id, timestamp)
    }

    pub fn success(&self) -> bool {
        self.code.is_success()
    }
}

pub fn success_message(action: Action) -> &'static str {
    match action {
        Action::ActivatePump => "Pump activated",
        Action::DeactivatePump => "Pump deactivated",
        Action::GetStatus => "Status retrieved",
        Action::SetPumpConfig => "Configuration updated",
        Action::Reboot => "Reboot initiated",
        Action::ResetConfig => "Configuration reset",
        Action::Heartbeat => "Alive",
    }
}

pub fn error_message(err: CommandError) -> &'static str {
    match err {
        CommandError::PumpNotFound => "Pump not found",
        CommandError::MalformedPumpId => "pump_id must be an integer",
        CommandError::PumpBusy => "Pump busy or in cooldown",
        CommandError::InvalidParams => "Invalid parameters",
        CommandError::UnrecognizedCommand => "Unrecognized command",
        CommandError::ParseFailure => "Malformed command payload",
    }
}
