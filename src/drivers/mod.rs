//! Low-level platform drivers.

pub mod pull_up;
pub mod task_pin;
pub mod watchdog;
