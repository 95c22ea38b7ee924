//! Level-triggered event bus.
//!
//! Events are produced by:
//! - Software timers expiring (sensor polls, watchdog feed, name bursts)
//! - Any other context that wants the worker's attention
//!
//! Events are consumed by exactly one worker, which snapshots the pending
//! set on each wake and drains it in ascending [`EventKind`] order.
//!
//! ```text
//! ┌─────────────┐  post   ┌──────────────────┐  wait   ┌──────────────┐
//! │ TimerService│────────▶│ pending: u32     │────────▶│ Worker loop  │
//! │ other tasks │────────▶│ wake:   Signal   │         │ (consumer)   │
//! └─────────────┘         └──────────────────┘         └──────────────┘
//! ```
//!
//! Posting the same kind twice before the consumer wakes collapses into
//! one indication.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::debug;

/// Subsystem event kinds.
/// Lower discriminant is drained first when several are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    // ── Housekeeping ──────────────────────────────────────
    /// Watchdog feed period elapsed.
    WatchdogFeed = 0,

    // ── Sensor polls ──────────────────────────────────────
    /// Particulate/VOC/NOx/RH/T peripheral is due for a read.
    PollParticulate = 1,
    /// CO2 peripheral is due for a read.
    PollCo2 = 2,

    // ── Advertising ───────────────────────────────────────
    /// Pre-empt the data broadcast with the device name.
    NameBurst = 3,
    /// Name burst is over, restore the data broadcast.
    NameBurstEnd = 4,
}

impl EventKind {
    pub const ALL: [Self; 5] = [
        Self::WatchdogFeed,
        Self::PollParticulate,
        Self::PollCo2,
        Self::NameBurst,
        Self::NameBurstEnd,
    ];

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::WatchdogFeed),
            1 => Some(Self::PollParticulate),
            2 => Some(Self::PollCo2),
            3 => Some(Self::NameBurst),
            4 => Some(Self::NameBurstEnd),
            _ => None,
        }
    }

    const fn bit(self) -> u32 {
        1 << self as u8
    }
}

// ── Pending-set snapshot ──────────────────────────────────────

/// Snapshot of pending events returned by [`EventBus::wait`].
///
/// Iterating yields kinds lowest-numbered first, removing each as it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet(u32);

impl EventSet {
    pub const EMPTY: Self = Self(0);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

impl FromIterator<EventKind> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |acc, k| acc | k.bit()))
    }
}

impl Iterator for EventSet {
    type Item = EventKind;

    fn next(&mut self) -> Option<EventKind> {
        while self.0 != 0 {
            let idx = self.0.trailing_zeros();
            self.0 &= !(1 << idx);
            // Bits outside the enum are never set by the bus.
            if let Some(kind) = EventKind::from_u8(idx as u8) {
                return Some(kind);
            }
        }
        None
    }
}

// ── Bus ───────────────────────────────────────────────────────

/// Multi-producer, single-consumer event bus.
pub struct EventBus {
    pending: AtomicU32,
    registered: AtomicU32,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
            registered: AtomicU32::new(0),
            wake: Signal::new(),
        }
    }

    /// Bind `kind` to this bus. Registering twice is a no-op.
    pub fn register(&self, kind: EventKind) {
        self.registered.fetch_or(kind.bit(), Ordering::AcqRel);
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.registered.load(Ordering::Acquire) & kind.bit() != 0
    }

    /// Mark `kind` pending and wake the consumer. Never blocks.
    ///
    /// Returns `false` if `kind` was never registered on this bus.
    pub fn post(&self, kind: EventKind) -> bool {
        if !self.is_registered(kind) {
            debug!("EventBus: dropped unregistered {:?}", kind);
            return false;
        }
        self.pending.fetch_or(kind.bit(), Ordering::AcqRel);
        self.wake.signal(());
        true
    }

    /// Atomically snapshot and clear the pending set without waiting.
    pub fn try_take(&self) -> EventSet {
        EventSet(self.pending.swap(0, Ordering::AcqRel))
    }

    /// Suspend until at least one event is pending or `timeout` elapses.
    ///
    /// `None` waits forever. On timeout the returned set is empty.
    pub async fn wait(&self, timeout: Option<Duration>) -> EventSet {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            // Clear a stale wake before sampling; a post racing this point
            // re-signals after setting its bit, so nothing is lost.
            self.wake.reset();
            let set = self.try_take();
            if !set.is_empty() {
                return set;
            }

            match deadline {
                None => self.wake.wait().await,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return EventSet::EMPTY;
                    }
                    let remaining = deadline - now;
                    let woken = future::or(
                        async {
                            self.wake.wait().await;
                            true
                        },
                        async {
                            async_io_mini::Timer::after(remaining).await;
                            false
                        },
                    )
                    .await;
                    if !woken {
                        return self.try_take();
                    }
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
