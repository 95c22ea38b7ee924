//! Unified error types for the gateway sensor subsystem.
//!
//! Every subsystem converts into a single `Error` enum so the worker loop
//! handles failures uniformly. All variants are `Copy`; none of them is ever
//! fatal, they only decide which retry path a caller takes.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the subsystem funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peripheral could not be probed, started or read.
    Sensor(SensorError),
    /// The BLE stack rejected an advertising request.
    Radio(RadioError),
    /// Configuration is invalid.
    Config(&'static str),
    /// Subsystem bring-up failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The peripheral has no new sample yet.
    NotReady,
    /// The I2C transaction failed (NACK, arbitration loss, timeout).
    Bus,
    /// A received word failed its CRC-8 check.
    Crc,
    /// The presence probe did not identify the expected part.
    NotPresent,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "data not ready"),
            Self::Bus => write!(f, "I2C bus error"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::NotPresent => write!(f, "peripheral not present"),
        }
    }
}

impl core::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Advertising data could not be configured.
    ConfigureFailed(i32),
    /// Advertising could not be started.
    StartFailed(i32),
    /// Advertising could not be stopped.
    StopFailed(i32),
    /// Payload does not fit the advertising PDU.
    PayloadTooLong,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigureFailed(rc) => write!(f, "adv data config failed (rc={rc})"),
            Self::StartFailed(rc) => write!(f, "adv start failed (rc={rc})"),
            Self::StopFailed(rc) => write!(f, "adv stop failed (rc={rc})"),
            Self::PayloadTooLong => write!(f, "payload exceeds advertising PDU"),
        }
    }
}

impl core::error::Error for RadioError {}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
