//! Per-pump timer/flag record.
//!
//! Only `Active` is stored. `Cooldown` and `Idle` are derived from the
//! deactivation timestamp every time they are queried, so there is a single
//! clock and nothing to drift:
//!
//! ```text
//! phase(now) = Active    if is_active
//!            = Cooldown  if now - cooldown_started_at < cooldown_window
//!            = Idle      otherwise (including "never deactivated")
//! ```
//!
//! Windows are latched when they open. Changing [`PumpTiming`] mid-cycle
//! only affects the next activation/cooldown.

use crate::config::PumpTiming;

/// Derived availability phase of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpPhase {
    Idle,
    Active,
    Cooldown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpState {
    pin: i32,
    timing: PumpTiming,
    is_active: bool,
    activation_started_at: u64,
    activation_window_ms: u32,
    cooldown_started_at: Option<u64>,
    cooldown_window_ms: u32,
}

impl PumpState {
    pub fn new(pin: i32, timing: PumpTiming) -> Self {
        Self {
            pin,
            timing,
            is_active: false,
            activation_started_at: 0,
            activation_window_ms: timing.activation_ms,
            cooldown_started_at: None,
            cooldown_window_ms: timing.cooldown_ms,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self, now_ms: u64) -> PumpPhase {
        if self.is_active {
            return PumpPhase::Active;
        }
        match self.cooldown_started_at {
            Some(t) if now_ms.saturating_sub(t) < u64::from(self.cooldown_window_ms) => {
                PumpPhase::Cooldown
            }
            _ => PumpPhase::Idle,
        }
    }

    pub fn is_available(&self, now_ms: u64) -> bool {
        self.phase(now_ms) == PumpPhase::Idle
    }

    /// Milliseconds left in the cooldown window; 0 while idle or active.
    pub fn cooldown_remaining(&self, now_ms: u64) -> u32 {
        match (self.phase(now_ms), self.cooldown_started_at) {
            (PumpPhase::Cooldown, Some(t)) => {
                let elapsed = now_ms.saturating_sub(t);
                u64::from(self.cooldown_window_ms).saturating_sub(elapsed) as u32
            }
            _ => 0,
        }
    }

    /// True once an active pump has run for its full activation window.
    pub fn activation_expired(&self, now_ms: u64) -> bool {
        self.is_active
            && now_ms.saturating_sub(self.activation_started_at)
                >= u64::from(self.activation_window_ms)
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    /// Configured timings, applied from the next cycle on.
    pub fn timing(&self) -> PumpTiming {
        self.timing
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Start of the current or most recent activation (0 if never).
    pub fn activation_started_at(&self) -> u64 {
        self.activation_started_at
    }

    pub fn cooldown_started_at(&self) -> Option<u64> {
        self.cooldown_started_at
    }

    // ── Transitions (controller only) ─────────────────────────

    pub(super) fn start(&mut self, now_ms: u64, window_ms: u32) {
        self.is_active = true;
        self.activation_started_at = now_ms;
        self.activation_window_ms = window_ms;
    }

    pub(super) fn stop(&mut self, now_ms: u64) {
        self.is_active = false;
        self.cooldown_started_at = Some(now_ms);
        self.cooldown_window_ms = self.timing.cooldown_ms;
    }

    pub(super) fn set_timing(&mut self, timing: PumpTiming) {
        self.timing = timing;
    }

    /// Restore `timing` and forget all bookkeeping: the pump is idle and
    /// immediately available afterwards.
    pub(super) fn reset(&mut self, timing: PumpTiming) {
        *self = Self::new(self.pin, timing);
    }
}
