//! Periodic publish scheduler.
//!
//! Drives the recurring work of the control loop: status snapshots every
//! `status_interval_ms` and heartbeats every `heartbeat_interval_ms`. The
//! scheduler notifies a [`SchedulerDelegate`] when a task comes due; the
//! link engine implements the delegate and queues the publish.
//!
//! ```text
//!   control loop ──poll(now)──▶ Scheduler ──on_schedule_fired()──▶ LinkEngine
//!                                                                    │
//!                                                                    ▼
//!                                                                 outbox
//! ```
//!
//! Intervals are measured on the uptime clock. A late poll fires once and
//! re-arms from the poll time; missed periods are not replayed.

use log::{debug, info};

use crate::app::ports::{PeriodicTask, SchedulerDelegate};
use crate::config::DeviceConfig;

// ═══════════════════════════════════════════════════════════════
//  Interval timer
// ═══════════════════════════════════════════════════════════════

/// A single recurring deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    next_due_ms: u64,
}

impl Interval {
    /// First fire one full period after `now_ms`.
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            next_due_ms: now_ms.saturating_add(period_ms),
        }
    }

    /// Returns `true` once per elapsed period and re-arms.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        self.next_due_ms = now_ms.saturating_add(self.period_ms);
        true
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of periodic tasks (stack-allocated).
const MAX_TASKS: usize = 2;

#[derive(Debug, Clone, Copy)]
struct TaskEntry {
    task: PeriodicTask,
    interval: Interval,
    enabled: bool,
}

pub struct Scheduler {
    tasks: heapless::Vec<TaskEntry, MAX_TASKS>,
}

impl Scheduler {
    /// Status and heartbeat timers from `config`, armed at `now_ms`.
    pub fn new(config: &DeviceConfig, now_ms: u64) -> Self {
        let mut sched = Self {
            tasks: heapless::Vec::new(),
        };
        sched.add(
            PeriodicTask::StatusPublish,
            u64::from(config.status_interval_ms),
            now_ms,
        );
        sched.add(
            PeriodicTask::Heartbeat,
            u64::from(config.heartbeat_interval_ms),
            now_ms,
        );
        sched
    }

    fn add(&mut self, task: PeriodicTask, period_ms: u64, now_ms: u64) {
        let entry = TaskEntry {
            task,
            interval: Interval::new(period_ms, now_ms),
            enabled: true,
        };
        if self.tasks.push(entry).is_ok() {
            info!("Scheduler: {:?} every {} ms", task, period_ms);
        }
    }

    /// Enable or disable one task.
    pub fn set_task_enabled(&mut self, task: PeriodicTask, enabled: bool) {
        for entry in self.tasks.iter_mut().filter(|e| e.task == task) {
            if entry.enabled != enabled {
                info!("Scheduler: {:?} {}", task, if enabled { "enabled" } else { "disabled" });
            }
            entry.enabled = enabled;
        }
    }

    /// Call once per control loop iteration.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.tasks.iter_mut().filter(|e| e.enabled) {
            if entry.interval.poll(now_ms) {
                debug!("Scheduler: {:?} due at {} ms", entry.task, now_ms);
                delegate.on_schedule_fired(entry.task);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
