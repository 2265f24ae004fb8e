//! Transport-agnostic command link.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       Link Stack                           │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Transport │──▶│ Mailbox  │──▶│  Engine (dispatcher)  │  │
//! │  │ (trait)   │   │ (queues) │   │  → AppService         │  │
//! │  └───────────┘   └──────────┘   └───────────────────────┘  │
//! │       ▲               ▲                    │               │
//! │       │               └────────────────────┘               │
//! │  ┌───────────┐   responses, status, config, heartbeat      │
//! │  │  I/O task │                                             │
//! │  └───────────┘                                             │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod io_task;
pub mod mailbox;
pub mod topics;
pub mod transport;
