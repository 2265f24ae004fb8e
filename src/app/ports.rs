//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (pump outputs, clock, event sinks, config storage,
//! system control) implement these traits. The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly. The command link has
//! its own port, [`Transport`](crate::link::transport::Transport).

use crate::config::{DeviceConfig, NetworkConfig};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to switch outputs.
pub trait ActuatorPort {
    /// Switch pump `pump_id`'s output on or off.
    ///
    /// Only called with ids the controller has already range-checked.
    fn set_pump_output(&mut self, pump_id: usize, on: bool);

    /// Kill every pump output — safe state.
    fn all_off(&mut self);

    /// Light the activity indicator for a short flash starting at `now_ms`.
    fn flash_activity(&mut self, now_ms: u64);

    /// Advance indicator timers (turns an expired flash off).
    fn update_indicators(&mut self, now_ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock. All pump timing is computed from it.
pub trait TimePort {
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// System port
// ───────────────────────────────────────────────────────────────

/// Device-level control requested by commands.
pub trait SystemPort {
    /// Restart the device. On hardware this does not return.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (driven by the periodic publish scheduler)
// ───────────────────────────────────────────────────────────────

/// Receives fire notifications from the [`Scheduler`](crate::scheduler::Scheduler).
pub trait SchedulerDelegate {
    /// Called when a periodic task comes due.
    fn on_schedule_fired(&mut self, task: PeriodicTask);
}

/// Recurring work the control loop performs on a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicTask {
    /// Publish a status snapshot.
    StatusPublish,
    /// Publish a heartbeat.
    Heartbeat,
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the provisioned device configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Load the device configuration.
    /// Returns [`DeviceConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist the device configuration.
    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;

    /// Load the network configuration.
    /// Returns [`NetworkConfig::default()`] if nothing is stored.
    fn load_network(&self) -> Result<NetworkConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
