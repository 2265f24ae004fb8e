//! Osmo scent-pump firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod link;
pub mod pins;
pub mod pumps;
pub mod scheduler;
pub mod status;

pub mod adapters;
pub mod drivers;

#[cfg(target_os = "espidf")]
mod esp_link_shims;

pub use error::{CommandError, PumpError};
