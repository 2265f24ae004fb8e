//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them, or assert
//! on them in tests.

use crate::command::ResponseCode;
use crate::config::PumpTiming;
use crate::pumps::PumpId;

/// Why a pump output was switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The activation window elapsed.
    Expired,
    /// A `deactivate_pump` command.
    Command,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has initialised its pumps.
    Started { pump_count: usize },

    PumpActivated {
        pump_id: PumpId,
        duration_ms: u32,
        forced: bool,
    },

    PumpDeactivated { pump_id: PumpId, reason: StopReason },

    /// `set_pump_config` changed one pump's timings.
    PumpConfigChanged { pump_id: PumpId, timing: PumpTiming },

    /// Every pump was restored to factory timings.
    ConfigReset,

    /// A command was answered with a non-2xx code.
    CommandRejected {
        command_id: String,
        action: String,
        code: ResponseCode,
    },

    /// A restart will be performed at `at_ms`.
    RestartScheduled { at_ms: u64 },
}
