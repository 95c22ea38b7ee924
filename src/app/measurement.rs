//! Latest-reading cache shared by the two pollers and the publisher.
//!
//! Writers replace one channel group whole; [`combine`] copies both groups
//! and advances the sample counter in one critical section. Nothing else
//! happens under the lock.
//!
//! [`combine`]: SharedMeasurementState::combine

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::sensors::{Co2Reading, ParticulateReading, SensorReading};

/// Counter ceiling. Never emitted; the value after `0xFFFE` is `0`.
pub const SEQUENCE_CEILING: u16 = 0xFFFF;

/// Snapshot produced by [`SharedMeasurementState::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedReading {
    pub particulate: ParticulateReading,
    pub co2: Co2Reading,
    pub sequence: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct Inner {
    particulate: ParticulateReading,
    co2: Co2Reading,
    counter: u16,
}

/// Next counter value, wrapping to 0 before the ceiling.
pub fn next_sequence(counter: u16) -> u16 {
    match counter.wrapping_add(1) {
        SEQUENCE_CEILING => 0,
        next => next,
    }
}

pub struct SharedMeasurementState {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner>>,
}

impl SharedMeasurementState {
    pub fn new() -> Self {
        Self::with_counter(0)
    }

    /// Start the counter at `counter`; the first `combine` returns the
    /// value after it.
    pub fn with_counter(counter: u16) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                counter,
                ..Inner::default()
            })),
        }
    }

    /// Replace the channel group `reading` belongs to. The other group is
    /// untouched.
    pub fn store(&self, reading: SensorReading) {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match reading {
                SensorReading::Particulate(r) => inner.particulate = r,
                SensorReading::Co2(r) => inner.co2 = r,
            }
        });
    }

    /// Copy both groups and advance the counter, atomically.
    pub fn combine(&self) -> CombinedReading {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            inner.counter = next_sequence(inner.counter);
            CombinedReading {
                particulate: inner.particulate,
                co2: inner.co2,
                sequence: inner.counter,
            }
        })
    }

    /// Current contents without advancing the counter.
    pub fn latest(&self) -> CombinedReading {
        self.inner.lock(|inner| {
            let inner = inner.borrow();
            CombinedReading {
                particulate: inner.particulate,
                co2: inner.co2,
                sequence: inner.counter,
            }
        })
    }
}

impl Default for SharedMeasurementState {
    fn default() -> Self {
        Self::new()
    }
}
