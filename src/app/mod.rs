//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the sensor subsystem: per-peripheral
//! polling with retry and re-init escalation, the shared measurement cache,
//! the advertisement payload format, advertising slot arbitration and the
//! watchdog feeder. All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod advertising;
pub mod measurement;
pub mod payload;
pub mod poller;
pub mod ports;
pub mod subsystem;
pub mod watchdog;
