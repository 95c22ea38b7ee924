//! Port traits: the hexagonal boundary between the subsystem and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorSubsystem (domain)
//! ```
//!
//! Driven adapters (Sensirion drivers, BLE radio, uplink channel, hardware
//! watchdog, monotonic clock) implement these traits. The
//! [`SensorSubsystem`](super::subsystem::SensorSubsystem) consumes them via
//! generics, so the domain core never touches hardware directly and tests
//! substitute mocks.

use core::time::Duration;

use crate::error::{RadioError, SensorError};
use crate::sensors::SensorReading;

use super::payload::Payload;

// ───────────────────────────────────────────────────────────────
// Peripheral port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One measurement peripheral.
pub trait Peripheral {
    /// Sample type produced by [`read_sample`](Self::read_sample).
    type Reading: Copy + Into<SensorReading>;

    /// Short tag used as the log prefix.
    const NAME: &'static str;

    /// Check the part is present and responding. Called once at startup and
    /// again by [`reinit`](Self::reinit).
    fn probe(&mut self) -> bool;

    /// Put the part into continuous sampling mode.
    fn start_sampling(&mut self) -> Result<(), SensorError>;

    /// Read the latest sample. [`SensorError::NotReady`] when none is
    /// available yet.
    fn read_sample(&mut self) -> Result<Self::Reading, SensorError>;

    /// Full recovery: probe, then restart sampling.
    fn reinit(&mut self) -> Result<(), SensorError> {
        if !self.probe() {
            return Err(SensorError::NotPresent);
        }
        self.start_sampling()
    }
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → BLE advertiser)
// ───────────────────────────────────────────────────────────────

/// What goes into the advertising PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvFrame<'a> {
    /// Encoded sensor payload, carried as manufacturer-specific data.
    Data(&'a Payload),
    /// Complete local name.
    Name(&'a str),
}

/// Single advertising slot of the BLE stack.
pub trait RadioPort {
    /// Replace whatever is on air with `frame`, advertised every
    /// `interval` × 0.625 ms.
    fn start_advertising(&mut self, frame: AdvFrame<'_>, interval: u16) -> Result<(), RadioError>;

    /// Take the slot off air. Stopping an idle slot succeeds.
    fn stop_advertising(&mut self) -> Result<(), RadioError>;

    /// `true` once the stack has finished bring-up.
    fn is_ready(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Uplink port (driven adapter: domain → network dispatcher)
// ───────────────────────────────────────────────────────────────

/// Hands each encoded payload to the network side.
pub trait UplinkPort {
    /// Offer `payload` without blocking. Returns `false` if it was dropped.
    fn dispatch(&mut self, payload: &Payload) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

pub trait WatchdogPort {
    /// Reset the hardware watchdog countdown.
    fn feed(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time since boot.
pub trait Clock {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
