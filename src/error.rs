//! Domain error types.
//!
//! [`PumpError`] comes out of the pump controller; [`CommandError`] is the
//! dispatcher's rejection taxonomy, which maps one-to-one onto response
//! codes. Both are `Copy` so they pass through the dispatcher without
//! allocation. Adapter-level failures use their own port error types.

use core::fmt;

// ---------------------------------------------------------------------------
// Pump controller errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpError {
    /// Pump id is outside `[0, pump_count)`.
    NotFound,
    /// Pump is active or cooling down and the request was not forced.
    Busy,
}

impl fmt::Display for PumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "pump not found"),
            Self::Busy => write!(f, "pump busy"),
        }
    }
}

impl core::error::Error for PumpError {}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Reasons a command is rejected. Never fatal: the dispatcher turns every
/// variant into a non-2xx [`CommandResponse`](crate::command::CommandResponse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    PumpNotFound,
    /// `pump_id` is present but not an integer.
    MalformedPumpId,
    PumpBusy,
    InvalidParams,
    UnrecognizedCommand,
    ParseFailure,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PumpNotFound => write!(f, "pump not found"),
            Self::MalformedPumpId => write!(f, "pump_id is not an integer"),
            Self::PumpBusy => write!(f, "pump busy (active or cooling down)"),
            Self::InvalidParams => write!(f, "invalid parameters"),
            Self::UnrecognizedCommand => write!(f, "unrecognized command"),
            Self::ParseFailure => write!(f, "malformed payload"),
        }
    }
}

impl core::error::Error for CommandError {}

impl From<PumpError> for CommandError {
    fn from(e: PumpError) -> Self {
        match e {
            PumpError::NotFound => Self::PumpNotFound,
            PumpError::Busy => Self::PumpBusy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pump_errors_map_onto_command_taxonomy() {
        assert_eq!(CommandError::from(PumpError::NotFound), CommandError::PumpNotFound);
        assert_eq!(CommandError::from(PumpError::Busy), CommandError::PumpBusy);
    }

    #[test]
    fn busy_message_names_both_causes() {
        assert_eq!(PumpError::Busy.to_string(), "pump busy");
        assert!(CommandError::PumpBusy.to_string().contains("cooling down"));
    }
}
