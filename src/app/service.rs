//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the [`PumpController`] and the command dispatcher.
//! It exposes a clean, hardware-agnostic API.  All I/O flows through
//! port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  transport ──raw──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │        AppService         │
//!  ActuatorPort ◀──── │  Command model · Pumps    │
//!                     └──────────────────────────┘
//!                         │ response / status / config payloads
//!                         ▼
//!                     transport
//! ```
//!
//! The service is single-owner: it lives on the control loop and every
//! mutation (dispatch, tick, snapshot) is serialized by that ownership.

use log::{info, warn};

use crate::command::{
    Command, CommandResponse, ValidCommand, Validator, parse_command,
};
use crate::config::{DeviceConfig, UnitId};
use crate::error::CommandError;
use crate::pumps::{ExpiredPumps, PumpController};
use crate::status::{self, StatusReport};

use super::events::{AppEvent, StopReason};
use super::ports::{ActuatorPort, EventSink};

/// Delay between answering `reboot` and actually restarting, so the
/// response can leave the device first.
pub const RESTART_DELAY_MS: u64 = 1_000;

/// Error category published on the errors topic for unparseable payloads.
pub const PARSE_ERROR_TYPE: &str = "parse_error";

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    controller: PumpController,
    validator: Validator,
    unit_id: UnitId,
    /// Uptime at which a requested restart becomes due.
    restart_at: Option<u64>,
    status_requested: bool,
    heartbeat_requested: bool,
    config_publish_pending: bool,
    /// Error payload waiting to be published on the errors topic.
    pending_error: Option<String>,
    commands_handled: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Pump outputs are untouched until [`start`](Self::start).
    pub fn new(config: &DeviceConfig) -> Self {
        let controller = PumpController::new(config);
        let validator = Validator::for_pump_count(controller.pump_count());
        Self {
            controller,
            validator,
            unit_id: config.unit_id.clone(),
            restart_at: None,
            status_requested: false,
            heartbeat_requested: false,
            config_publish_pending: false,
            pending_error: None,
            commands_handled: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every pump output off and reset all pump state.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.controller.initialize(hw);
        sink.emit(&AppEvent::Started {
            pump_count: self.controller.pump_count(),
        });
        info!(
            "AppService started: unit={} pumps={}",
            self.unit_id,
            self.controller.pump_count()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance pump timers and indicator timers.
    ///
    /// Must be polled at `control_loop_interval_ms`; pump timing accuracy
    /// is bounded by the poll interval.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> ExpiredPumps {
        let expired = self.controller.tick(now_ms, hw);
        for &pump_id in &expired {
            sink.emit(&AppEvent::PumpDeactivated {
                pump_id,
                reason: StopReason::Expired,
            });
        }
        hw.update_indicators(now_ms);
        expired
    }

    // ── Command handling ──────────────────────────────────────

    /// Full inbound path: parse, validate, dispatch, encode the response.
    ///
    /// Always returns a response payload, whatever the input.
    pub fn handle_incoming_payload(
        &mut self,
        raw: &str,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> String {
        hw.flash_activity(now_ms);
        let cmd = parse_command(raw);
        if cmd.is_parse_failure() {
            warn!("CMD | unparseable payload ({} bytes)", raw.len());
            self.pending_error = Some(status::error_payload(
                PARSE_ERROR_TYPE,
                "Malformed command payload",
                now_ms,
                &self.unit_id,
            ));
        }
        let resp = self.dispatch(&cmd, now_ms, hw, sink);
        status::response_payload(&resp, &self.unit_id)
    }

    /// Validate `cmd` and apply it. Exactly one response per command.
    ///
    /// Validation happens before any controller call, so a rejected
    /// command leaves pump state and outputs untouched.
    pub fn dispatch(
        &mut self,
        cmd: &Command,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> CommandResponse {
        self.commands_handled += 1;
        let outcome = self
            .validator
            .validate(cmd)
            .and_then(|valid| self.execute(valid, now_ms, hw, sink).map(|()| valid));

        match outcome {
            Ok(valid) => {
                info!("CMD | {} '{}' ok", valid.action().as_str(), cmd.command_id);
                CommandResponse::ok(valid.action(), &cmd.command_id, now_ms)
            }
            Err(e) => {
                let resp = CommandResponse::rejected(e, &cmd.command_id, now_ms);
                warn!(
                    "CMD | {} '{}' rejected: {} ({})",
                    if cmd.action.is_empty() { "<none>" } else { cmd.action.as_str() },
                    cmd.command_id,
                    e,
                    resp.code
                );
                sink.emit(&AppEvent::CommandRejected {
                    command_id: cmd.command_id.clone(),
                    action: cmd.action.clone(),
                    code: resp.code,
                });
                resp
            }
        }
    }

    fn execute(
        &mut self,
        cmd: ValidCommand,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        match cmd {
            ValidCommand::ActivatePump {
                pump_id,
                duration_ms,
                force,
            } => {
                let duration_ms = match duration_ms {
                    Some(d) => d,
                    None => self.controller.pump(pump_id)?.timing().activation_ms,
                };
                self.controller
                    .activate_for(pump_id, duration_ms, now_ms, force, hw)?;
                sink.emit(&AppEvent::PumpActivated {
                    pump_id,
                    duration_ms,
                    forced: force,
                });
            }
            ValidCommand::DeactivatePump { pump_id } => {
                self.controller.deactivate(pump_id, now_ms, hw)?;
                sink.emit(&AppEvent::PumpDeactivated {
                    pump_id,
                    reason: StopReason::Command,
                });
            }
            ValidCommand::GetStatus => {
                self.status_requested = true;
                self.config_publish_pending = true;
            }
            ValidCommand::SetPumpConfig {
                pump_id,
                activation_ms,
                cooldown_ms,
            } => {
                self.controller
                    .set_config(pump_id, activation_ms, cooldown_ms)?;
                self.config_publish_pending = true;
                sink.emit(&AppEvent::PumpConfigChanged {
                    pump_id,
                    timing: self.controller.pump(pump_id)?.timing(),
                });
            }
            ValidCommand::Reboot => {
                let at_ms = now_ms + RESTART_DELAY_MS;
                self.restart_at = Some(at_ms);
                sink.emit(&AppEvent::RestartScheduled { at_ms });
            }
            ValidCommand::ResetConfig => {
                self.controller.reset_all_configs(hw);
                self.config_publish_pending = true;
                sink.emit(&AppEvent::ConfigReset);
            }
            ValidCommand::Heartbeat => {
                self.heartbeat_requested = true;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn snapshot_status(&self, now_ms: u64) -> StatusReport {
        StatusReport::capture(&self.controller, &self.unit_id, now_ms)
    }

    pub fn snapshot_status_payload(&self, now_ms: u64) -> String {
        self.snapshot_status(now_ms).to_json()
    }

    pub fn config_payload(&self) -> String {
        status::config_payload(&self.controller, &self.unit_id)
    }

    pub fn controller(&self) -> &PumpController {
        &self.controller
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Commands dispatched since startup, accepted or not.
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    // ── Publish requests ──────────────────────────────────────
    //
    // Set by dispatch, consumed by the link engine. Each `take_*` clears
    // its flag.

    pub fn take_status_request(&mut self) -> bool {
        core::mem::take(&mut self.status_requested)
    }

    pub fn take_heartbeat_request(&mut self) -> bool {
        core::mem::take(&mut self.heartbeat_requested)
    }

    pub fn take_config_publish(&mut self) -> bool {
        core::mem::take(&mut self.config_publish_pending)
    }

    pub fn take_error_payload(&mut self) -> Option<String> {
        self.pending_error.take()
    }

    // ── Restart ───────────────────────────────────────────────

    pub fn restart_pending(&self) -> bool {
        self.restart_at.is_some()
    }

    /// True once the restart delay after a `reboot` command has elapsed.
    pub fn restart_due(&self, now_ms: u64) -> bool {
        self.restart_at.is_some_and(|at| now_ms >= at)
    }
}
