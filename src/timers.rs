//! Software timer service.
//!
//! One-shot and periodic timers that post an [`EventKind`] into an
//! [`EventBus`] when they expire. Time is supplied by the caller as a
//! monotonic `Duration` since boot, so the service is driven identically by
//! the real clock on target and a manual clock in tests.
//!
//! ```text
//!   worker loop ── fire_expired(now) ──▶ TimerService ── post ──▶ EventBus
//!        ▲                                   │
//!        └──────── next_deadline() ──────────┘
//! ```
//!
//! Arm-state changes and expiry processing share one lock, so a restart
//! racing an expiry either lands before it (and replaces the deadline) or
//! after it (and re-arms the already-fired timer). Neither path can post
//! twice for one deadline or lose the next one.

use core::cell::RefCell;
use core::time::Duration;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec;
use log::warn;

use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind};

/// Capacity of the timer table. Five timers are used by one subsystem.
pub const MAX_TIMERS: usize = 8;

// ═══════════════════════════════════════════════════════════════
//  Handles
// ═══════════════════════════════════════════════════════════════

/// Index into the timer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u8);

/// Handle to a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneShot(TimerId);

/// Handle to a periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic(TimerId);

impl From<OneShot> for TimerId {
    fn from(h: OneShot) -> Self {
        h.0
    }
}

impl From<Periodic> for TimerId {
    fn from(h: Periodic) -> Self {
        h.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    OneShot,
    Periodic,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    target: EventKind,
    mode: Mode,
    period: Duration,
    /// `Some` while armed.
    deadline: Option<Duration>,
}

// ═══════════════════════════════════════════════════════════════
//  Service
// ═══════════════════════════════════════════════════════════════

pub struct TimerService {
    slots: Mutex<CriticalSectionRawMutex, RefCell<Vec<Slot, MAX_TIMERS>>>,
}

impl TimerService {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    fn create(&self, target: EventKind, mode: Mode, period: Duration) -> Result<TimerId> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let id = TimerId(slots.len() as u8);
            slots
                .push(Slot {
                    target,
                    mode,
                    period,
                    deadline: None,
                })
                .map_err(|_| Error::Init("timer table full"))?;
            Ok(id)
        })
    }

    /// Create a disarmed one-shot timer posting `target`.
    pub fn create_one_shot(&self, target: EventKind) -> Result<OneShot> {
        self.create(target, Mode::OneShot, Duration::ZERO).map(OneShot)
    }

    /// Create a disarmed periodic timer posting `target` every `period`.
    pub fn create_periodic(&self, target: EventKind, period: Duration) -> Result<Periodic> {
        if period.is_zero() {
            return Err(Error::Config("periodic timer needs a non-zero period"));
        }
        self.create(target, Mode::Periodic, period).map(Periodic)
    }

    fn with_slot<R>(&self, id: TimerId, f: impl FnOnce(&mut Slot) -> R) -> Option<R> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            slots.get_mut(usize::from(id.0)).map(f)
        })
    }

    // ── One-shot ──────────────────────────────────────────────

    /// Arm `h` to fire once, `delay` after `now`.
    pub fn start_once(&self, h: OneShot, delay: Duration, now: Duration) {
        self.restart_once(h, delay, now);
    }

    /// Replace the remaining delay of `h`, armed or not.
    pub fn restart_once(&self, h: OneShot, delay: Duration, now: Duration) {
        if self
            .with_slot(h.0, |slot| {
                slot.period = delay;
                slot.deadline = Some(now.saturating_add(delay));
            })
            .is_none()
        {
            warn!("Timers: restart of unknown timer {:?}", h);
        }
    }

    // ── Periodic ──────────────────────────────────────────────

    /// Arm `h` to fire every period, first expiry one period after `now`.
    pub fn start_periodic(&self, h: Periodic, now: Duration) {
        if self
            .with_slot(h.0, |slot| slot.deadline = Some(now.saturating_add(slot.period)))
            .is_none()
        {
            warn!("Timers: start of unknown timer {:?}", h);
        }
    }

    /// Change the period of `h`. The next expiry is one new period after
    /// `now`; a stopped timer is armed by this call.
    pub fn restart_periodic(&self, h: Periodic, period: Duration, now: Duration) {
        if period.is_zero() {
            warn!("Timers: ignoring zero period for {:?}", h);
            return;
        }
        if self
            .with_slot(h.0, |slot| {
                slot.period = period;
                slot.deadline = Some(now.saturating_add(period));
            })
            .is_none()
        {
            warn!("Timers: restart of unknown timer {:?}", h);
        }
    }

    // ── Common ────────────────────────────────────────────────

    /// Disarm a timer. Stopping a disarmed timer is a no-op.
    pub fn stop(&self, h: impl Into<TimerId>) {
        self.with_slot(h.into(), |slot| slot.deadline = None);
    }

    pub fn is_armed(&self, h: impl Into<TimerId>) -> bool {
        self.with_slot(h.into(), |slot| slot.deadline.is_some())
            .unwrap_or(false)
    }

    /// Absolute deadline of `h`, if armed.
    pub fn deadline(&self, h: impl Into<TimerId>) -> Option<Duration> {
        self.with_slot(h.into(), |slot| slot.deadline).flatten()
    }

    /// Earliest deadline across all armed timers.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.slots.lock(|slots| {
            slots
                .borrow()
                .iter()
                .filter_map(|s| s.deadline)
                .min()
        })
    }

    /// Post the event of every timer whose deadline is at or before `now`.
    ///
    /// One-shots disarm. Periodics advance by one period; a periodic that
    /// fell more than a period behind skips the missed expiries instead of
    /// bursting. Returns how many timers fired.
    pub fn fire_expired(&self, now: Duration, bus: &EventBus) -> usize {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let mut fired = 0;
            for slot in slots.iter_mut() {
                let Some(deadline) = slot.deadline else {
                    continue;
                };
                if deadline > now {
                    continue;
                }
                bus.post(slot.target);
                fired += 1;
                slot.deadline = match slot.mode {
                    Mode::OneShot => None,
                    Mode::Periodic => {
                        let next = deadline.saturating_add(slot.period);
                        Some(if next <= now {
                            now.saturating_add(slot.period)
                        } else {
                            next
                        })
                    }
                };
            }
            fired
        })
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}
