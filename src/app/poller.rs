//! Per-peripheral polling state machine.
//!
//! ```text
//!                 read ok                      read failed, count < max
//!   ┌───────────────────────────┐          ┌───────────────────────────┐
//!   ▼                           │          │                           ▼
//! WaitingSample ── fail ──▶ ErrorRecovery ─┘      re-check after short period
//!   ▲                           │
//!   └──────── read ok ──────────┘      count == max: reinit, poll after 2 × normal
//! ```
//!
//! A peripheral that fails its startup probe gets no poller at all; the
//! subsystem reports it as [`PollerState::Absent`]. A running poller never
//! becomes absent, however long the peripheral stays silent.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::PollSchedule;
use crate::error::{Error, Result, SensorError};
use crate::events::EventKind;
use crate::sensors::SensorReading;
use crate::timers::{OneShot, TimerService};

use super::measurement::SharedMeasurementState;
use super::ports::Peripheral;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Startup probe failed; never polled.
    Absent,
    /// Last read succeeded (or none has been attempted yet).
    WaitingSample,
    /// At least one consecutive read has failed.
    ErrorRecovery,
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// New reading stored in the shared state; the caller publishes.
    Sampled(SensorReading),
    /// Read failed; re-check scheduled after the short period.
    Retry,
    /// Retries exhausted; peripheral re-initialised (`ok` is the outcome)
    /// and the next poll backed off.
    Reinit { ok: bool },
}

pub struct SensorPoller<P: Peripheral> {
    peripheral: P,
    schedule: PollSchedule,
    timer: OneShot,
    error_count: u8,
    reinit_count: u32,
}

impl<P: Peripheral> SensorPoller<P> {
    /// Probe `peripheral` and, if present, start sampling and arm the first
    /// poll one normal period after `now`.
    ///
    /// `Ok(None)` means the peripheral is absent.
    pub fn start(
        mut peripheral: P,
        schedule: PollSchedule,
        timers: &TimerService,
        event: EventKind,
        now: Duration,
    ) -> Result<Option<Self>> {
        if !peripheral.probe() {
            info!("{}: not found, poller disabled", P::NAME);
            return Ok(None);
        }
        if let Err(e) = peripheral.start_sampling() {
            // The first polls fail and escalate to reinit.
            warn!("{}: start sampling failed: {}", P::NAME, e);
        }
        let timer = timers.create_one_shot(event)?;
        timers.start_once(timer, schedule.normal_period, now);
        info!(
            "{}: polling every {} ms",
            P::NAME,
            schedule.normal_period.as_millis()
        );
        Ok(Some(Self {
            peripheral,
            schedule,
            timer,
            error_count: 0,
            reinit_count: 0,
        }))
    }

    pub fn state(&self) -> PollerState {
        if self.error_count == 0 {
            PollerState::WaitingSample
        } else {
            PollerState::ErrorRecovery
        }
    }

    pub fn error_count(&self) -> u8 {
        self.error_count
    }

    /// Number of full re-inits since start.
    pub fn reinit_count(&self) -> u32 {
        self.reinit_count
    }

    pub fn timer(&self) -> OneShot {
        self.timer
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Handle one poll event: read once, store on success, reschedule.
    pub fn on_poll(
        &mut self,
        timers: &TimerService,
        shared: &SharedMeasurementState,
        now: Duration,
    ) -> PollOutcome {
        match self.peripheral.read_sample() {
            Ok(reading) => {
                let reading: SensorReading = reading.into();
                self.error_count = 0;
                timers.restart_once(self.timer, self.schedule.after_success(), now);
                shared.store(reading);
                info!("{}: {}", P::NAME, reading);
                PollOutcome::Sampled(reading)
            }
            Err(e) if self.error_count < self.schedule.max_retries => {
                self.error_count += 1;
                timers.restart_once(self.timer, self.schedule.short_check_period, now);
                if e == SensorError::NotReady {
                    debug!("{}: not ready (retry {})", P::NAME, self.error_count);
                } else {
                    warn!("{}: read failed: {} (retry {})", P::NAME, e, self.error_count);
                }
                PollOutcome::Retry
            }
            Err(e) => {
                self.error_count = self.schedule.max_retries;
                self.reinit_count = self.reinit_count.saturating_add(1);
                warn!(
                    "{}: {} consecutive failures (last: {}), reinitialising",
                    P::NAME,
                    self.error_count,
                    e
                );
                let ok = match self.peripheral.reinit() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("{}: reinit failed: {}", P::NAME, Error::from(e));
                        false
                    }
                };
                timers.restart_once(self.timer, self.schedule.backoff(), now);
                PollOutcome::Reinit { ok }
            }
        }
    }
}
