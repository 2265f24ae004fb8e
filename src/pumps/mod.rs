//! Pump controller — activation / cooldown discipline for every pump.
//!
//! Each pump moves through three phases:
//!
//! ```text
//!            activate()                tick(): window elapsed
//!   ┌──────┐ ─────────▶ ┌────────┐ ─────────────────────────▶ ┌──────────┐
//!   │ Idle │            │ Active │        or deactivate()     │ Cooldown │
//!   └──────┘ ◀───────── └────────┘                            └──────────┘
//!      ▲     (derived)                                             │
//!      └───────────────────── cooldown window elapsed ─────────────┘
//! ```
//!
//! Only `Active` is stored; see [`state`] for how the other phases are
//! derived. The controller never reads a clock: every operation takes the
//! caller's `now_ms`, so timing accuracy is bounded by how often
//! [`PumpController::tick`] is polled.
//!
//! Physical outputs are switched through an injected
//! [`ActuatorPort`]. An out-of-range pump id never reaches the port.

pub mod state;

use log::{debug, info};

use crate::app::ports::ActuatorPort;
use crate::config::{DeviceConfig, MAX_PUMPS, PumpTiming};
use crate::error::PumpError;

pub use state::{PumpPhase, PumpState};

/// Index into the controller's pump table, `0..pump_count`.
pub type PumpId = usize;

/// Pumps switched off by one [`PumpController::tick`].
pub type ExpiredPumps = heapless::Vec<PumpId, MAX_PUMPS>;

pub struct PumpController {
    pumps: Vec<PumpState>,
    defaults: PumpTiming,
}

impl PumpController {
    /// Build one idle pump record per configured pin.
    pub fn new(config: &DeviceConfig) -> Self {
        let defaults = config.pump_defaults;
        let pumps = config
            .active_pins()
            .iter()
            .map(|&pin| PumpState::new(pin, defaults))
            .collect();
        Self { pumps, defaults }
    }

    /// Drive every output to its off level and reset all records to idle.
    /// Safe to call more than once.
    pub fn initialize(&mut self, hw: &mut impl ActuatorPort) {
        hw.all_off();
        for pump in &mut self.pumps {
            pump.reset(pump.timing());
        }
        for (id, pump) in self.pumps.iter().enumerate() {
            info!("PUMP | {} on GPIO{}", id, pump.pin());
        }
        info!("PumpController initialised with {} pumps", self.pumps.len());
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn pump_count(&self) -> usize {
        self.pumps.len()
    }

    pub fn pump(&self, pump_id: PumpId) -> Result<&PumpState, PumpError> {
        self.pumps.get(pump_id).ok_or(PumpError::NotFound)
    }

    /// All pump records, index = pump id.
    pub fn pumps(&self) -> &[PumpState] {
        &self.pumps
    }

    /// `false` for unknown ids; otherwise true iff neither active nor
    /// cooling down.
    pub fn is_available(&self, pump_id: PumpId, now_ms: u64) -> bool {
        self.pumps
            .get(pump_id)
            .is_some_and(|p| p.is_available(now_ms))
    }

    pub fn is_active(&self, pump_id: PumpId) -> Result<bool, PumpError> {
        self.pump(pump_id).map(PumpState::is_active)
    }

    pub fn phase(&self, pump_id: PumpId, now_ms: u64) -> Result<PumpPhase, PumpError> {
        self.pump(pump_id).map(|p| p.phase(now_ms))
    }

    pub fn cooldown_remaining(&self, pump_id: PumpId, now_ms: u64) -> Result<u32, PumpError> {
        self.pump(pump_id).map(|p| p.cooldown_remaining(now_ms))
    }

    /// Factory timings restored by [`reset_config`](Self::reset_config).
    pub fn defaults(&self) -> PumpTiming {
        self.defaults
    }

    // ── Activation ────────────────────────────────────────────

    /// Switch a pump on for its configured activation time.
    ///
    /// `force` skips the availability check only. A forced re-activation of
    /// a running pump restarts its window from `now_ms`; durations never
    /// stack.
    pub fn activate(
        &mut self,
        pump_id: PumpId,
        now_ms: u64,
        force: bool,
        hw: &mut impl ActuatorPort,
    ) -> Result<(), PumpError> {
        let window = self.pump(pump_id)?.timing().activation_ms;
        self.activate_for(pump_id, window, now_ms, force, hw)
    }

    /// Like [`activate`](Self::activate) but runs this one activation for
    /// `duration_ms` instead of the configured time.
    pub fn activate_for(
        &mut self,
        pump_id: PumpId,
        duration_ms: u32,
        now_ms: u64,
        force: bool,
        hw: &mut impl ActuatorPort,
    ) -> Result<(), PumpError> {
        let pump = self.pumps.get_mut(pump_id).ok_or(PumpError::NotFound)?;
        if !force && !pump.is_available(now_ms) {
            debug!(
                "PUMP | {} busy ({:?}, cooldown {} ms)",
                pump_id,
                pump.phase(now_ms),
                pump.cooldown_remaining(now_ms)
            );
            return Err(PumpError::Busy);
        }

        hw.set_pump_output(pump_id, true);
        pump.start(now_ms, duration_ms);
        info!(
            "PUMP | {} on for {} ms{}",
            pump_id,
            duration_ms,
            if force { " (forced)" } else { "" }
        );
        Ok(())
    }

    /// Switch a pump off and open its cooldown window at `now_ms`.
    ///
    /// Also stamps a fresh cooldown on a pump that was already idle.
    pub fn deactivate(
        &mut self,
        pump_id: PumpId,
        now_ms: u64,
        hw: &mut impl ActuatorPort,
    ) -> Result<(), PumpError> {
        let pump = self.pumps.get_mut(pump_id).ok_or(PumpError::NotFound)?;
        let was_active = pump.is_active();
        hw.set_pump_output(pump_id, false);
        pump.stop(now_ms);
        info!(
            "PUMP | {} off{}, cooldown {} ms",
            pump_id,
            if was_active { "" } else { " (was idle)" },
            pump.cooldown_remaining(now_ms)
        );
        Ok(())
    }

    /// Periodic timer service: switch off every active pump whose
    /// activation window has elapsed and start its cooldown.
    ///
    /// Returns the ids that were switched off.
    pub fn tick(&mut self, now_ms: u64, hw: &mut impl ActuatorPort) -> ExpiredPumps {
        let mut expired = ExpiredPumps::new();
        for (id, pump) in self.pumps.iter_mut().enumerate() {
            if pump.activation_expired(now_ms) {
                hw.set_pump_output(id, false);
                pump.stop(now_ms);
                info!(
                    "PUMP | {} window elapsed, cooldown {} ms",
                    id,
                    pump.timing().cooldown_ms
                );
                // pumps.len() <= MAX_PUMPS, so this never overflows.
                let _ = expired.push(id);
            }
        }
        expired
    }

    // ── Configuration ─────────────────────────────────────────

    /// Change a pump's timings. Takes effect from the next activation /
    /// cooldown; a window already open keeps its length.
    ///
    /// Range checking belongs to the command model, not here.
    pub fn set_config(
        &mut self,
        pump_id: PumpId,
        activation_ms: u32,
        cooldown_ms: u32,
    ) -> Result<(), PumpError> {
        let pump = self.pumps.get_mut(pump_id).ok_or(PumpError::NotFound)?;
        pump.set_timing(PumpTiming {
            activation_ms,
            cooldown_ms,
        });
        info!(
            "PUMP | {} config: activation={} ms, cooldown={} ms",
            pump_id, activation_ms, cooldown_ms
        );
        Ok(())
    }

    /// Restore factory timings and clear bookkeeping so the pump is
    /// immediately available. A running pump is switched off without
    /// entering cooldown.
    pub fn reset_config(
        &mut self,
        pump_id: PumpId,
        hw: &mut impl ActuatorPort,
    ) -> Result<(), PumpError> {
        let defaults = self.defaults;
        let pump = self.pumps.get_mut(pump_id).ok_or(PumpError::NotFound)?;
        if pump.is_active() {
            hw.set_pump_output(pump_id, false);
        }
        pump.reset(defaults);
        Ok(())
    }

    pub fn reset_all_configs(&mut self, hw: &mut impl ActuatorPort) {
        for id in 0..self.pumps.len() {
            // Every id in 0..len is in range.
            let _ = self.reset_config(id, hw);
        }
        info!(
            "PUMP | all configs reset (activation={} ms, cooldown={} ms)",
            self.defaults.activation_ms, self.defaults.cooldown_ms
        );
    }
}
