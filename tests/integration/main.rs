//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below maps to a file that exercises one part of the sensor
//! subsystem against the mocks in `mock_hw`. Time is virtual: tests pass
//! explicit `now` values instead of sleeping. All tests run on the host
//! with no real hardware.

mod arbiter_tests;
mod mock_hw;
mod sensirion_tests;
mod worker_tests;
