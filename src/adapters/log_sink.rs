//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::{AppEvent, StopReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { pump_count } => {
                info!("START | {} pumps ready", pump_count);
            }
            AppEvent::PumpActivated {
                pump_id,
                duration_ms,
                forced,
            } => {
                info!(
                    "PUMP | {} on for {} ms{}",
                    pump_id,
                    duration_ms,
                    if *forced { " (forced)" } else { "" }
                );
            }
            AppEvent::PumpDeactivated { pump_id, reason } => {
                let why = match reason {
                    StopReason::Expired => "expired",
                    StopReason::Command => "command",
                };
                info!("PUMP | {} off ({})", pump_id, why);
            }
            AppEvent::PumpConfigChanged { pump_id, timing } => {
                info!(
                    "PUMP | {} config: activation={} ms cooldown={} ms",
                    pump_id, timing.activation_ms, timing.cooldown_ms
                );
            }
            AppEvent::ConfigReset => {
                info!("PUMP | all configs reset to defaults");
            }
            AppEvent::CommandRejected {
                command_id,
                action,
                code,
            } => {
                warn!(
                    "CMD | rejected id={} action={} code={}",
                    command_id, action, code
                );
            }
            AppEvent::RestartScheduled { at_ms } => {
                warn!("SYS | restart scheduled at {} ms", at_ms);
            }
        }
    }
}
