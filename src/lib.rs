//! AirQ gateway sensor-subsystem library.
//!
//! Exposes the pure-logic modules for integration testing and the binary.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation stand-ins.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod sensors;
pub mod timers;
pub mod worker;

mod esp_link_shims;
