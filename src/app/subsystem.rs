//! Sensor subsystem: the context object tying everything together.
//!
//! [`SensorSubsystem`] owns the timer table, both pollers, the advertising
//! arbiter, the watchdog feeder and the driven ports. The event bus and the
//! measurement cache are shared through `Arc` handles so other tasks can
//! post events or peek at the latest reading, and so independent instances
//! can coexist in tests.
//!
//! ```text
//!   EventBus ──▶ dispatch(kind) ─┬─ WatchdogFeed    ──▶ WatchdogFeeder ──▶ WatchdogPort
//!                                ├─ PollParticulate ──▶ SensorPoller ─┐
//!                                ├─ PollCo2         ──▶ SensorPoller ─┤ Sampled
//!                                │                                    ▼
//!                                │                   combine → encode → RadioPort + UplinkPort
//!                                ├─ NameBurst       ──▶ AdvertisingArbiter ──▶ RadioPort
//!                                └─ NameBurstEnd    ──▶ AdvertisingArbiter (rebuild data)
//! ```

use core::time::Duration;
use std::sync::Arc;

use log::{debug, info};

use crate::adapters::device_id::DeviceIdentity;
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::events::{EventBus, EventKind, EventSet};
use crate::timers::TimerService;

use super::advertising::{AdvertisingArbiter, AdvertisingSlot};
use super::measurement::{CombinedReading, SharedMeasurementState};
use super::payload::encode_payload;
use super::poller::{PollOutcome, PollerState, SensorPoller};
use super::ports::{Peripheral, RadioPort, UplinkPort, WatchdogPort};
use super::watchdog::WatchdogFeeder;

/// Driven ports other than the peripherals.
pub struct Ports<R, U, W> {
    pub radio: R,
    pub uplink: U,
    pub watchdog: W,
}

pub struct SensorSubsystem<Pm, Co, R, U, W>
where
    Pm: Peripheral,
    Co: Peripheral,
{
    identity: DeviceIdentity,
    bus: Arc<EventBus>,
    shared: Arc<SharedMeasurementState>,
    timers: TimerService,
    particulate: Option<SensorPoller<Pm>>,
    co2: Option<SensorPoller<Co>>,
    arbiter: AdvertisingArbiter,
    feeder: WatchdogFeeder,
    ports: Ports<R, U, W>,
    published: u32,
}

impl<Pm, Co, R, U, W> SensorSubsystem<Pm, Co, R, U, W>
where
    Pm: Peripheral,
    Co: Peripheral,
    R: RadioPort,
    U: UplinkPort,
    W: WatchdogPort,
{
    /// Probe both peripherals and arm every timer.
    ///
    /// `Ok(None)` when neither peripheral answered its probe: the subsystem
    /// did not start and nothing is left running.
    pub fn start(
        config: &GatewayConfig,
        identity: DeviceIdentity,
        particulate: Pm,
        co2: Co,
        ports: Ports<R, U, W>,
        now: Duration,
    ) -> Result<Option<Self>> {
        config.validate()?;

        let bus = Arc::new(EventBus::new());
        for kind in EventKind::ALL {
            bus.register(kind);
        }
        let timers = TimerService::new();

        let particulate = SensorPoller::start(
            particulate,
            config.particulate_schedule()?,
            &timers,
            EventKind::PollParticulate,
            now,
        )?;
        let co2 = SensorPoller::start(
            co2,
            config.co2_schedule()?,
            &timers,
            EventKind::PollCo2,
            now,
        )?;
        if particulate.is_none() && co2.is_none() {
            info!("Sensors: no peripheral found, subsystem not started");
            return Ok(None);
        }

        let feeder = WatchdogFeeder::start(config.watchdog_feed_period(), &timers, now)?;
        let arbiter = AdvertisingArbiter::new(config, identity.device_name(), &timers, now)?;

        info!(
            "Sensors: started for {} ({}: {}, {}: {})",
            identity,
            Pm::NAME,
            if particulate.is_some() { "yes" } else { "absent" },
            Co::NAME,
            if co2.is_some() { "yes" } else { "absent" },
        );

        Ok(Some(Self {
            identity,
            bus,
            shared: Arc::new(SharedMeasurementState::new()),
            timers,
            particulate,
            co2,
            arbiter,
            feeder,
            ports,
            published: 0,
        }))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn shared(&self) -> Arc<SharedMeasurementState> {
        Arc::clone(&self.shared)
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn ports(&self) -> &Ports<R, U, W> {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut Ports<R, U, W> {
        &mut self.ports
    }

    pub fn particulate_poller(&self) -> Option<&SensorPoller<Pm>> {
        self.particulate.as_ref()
    }

    pub fn co2_poller(&self) -> Option<&SensorPoller<Co>> {
        self.co2.as_ref()
    }

    pub fn particulate_state(&self) -> PollerState {
        self.particulate
            .as_ref()
            .map_or(PollerState::Absent, SensorPoller::state)
    }

    pub fn co2_state(&self) -> PollerState {
        self.co2.as_ref().map_or(PollerState::Absent, SensorPoller::state)
    }

    pub fn advertising_slot(&self) -> AdvertisingSlot {
        self.arbiter.slot()
    }

    pub fn arbiter(&self) -> &AdvertisingArbiter {
        &self.arbiter
    }

    pub fn watchdog_feeds(&self) -> u64 {
        self.feeder.feeds()
    }

    /// Payloads published since start.
    pub fn published(&self) -> u32 {
        self.published
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Post events for every timer due at `now`.
    pub fn fire_timers(&self, now: Duration) -> usize {
        self.timers.fire_expired(now, &self.bus)
    }

    /// How long the worker may sleep before the next timer is due.
    pub fn next_timeout(&self, now: Duration) -> Option<Duration> {
        self.timers
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(now))
    }

    /// Handle every event in `set`, lowest kind first.
    pub fn dispatch(&mut self, set: EventSet, now: Duration) {
        for kind in set {
            self.handle(kind, now);
        }
    }

    /// Fire due timers and handle whatever is pending, without waiting.
    pub fn run_once(&mut self, now: Duration) {
        self.fire_timers(now);
        let set = self.bus.try_take();
        self.dispatch(set, now);
    }

    fn handle(&mut self, kind: EventKind, now: Duration) {
        match kind {
            EventKind::WatchdogFeed => self.feeder.on_feed(&mut self.ports.watchdog),
            EventKind::PollParticulate => {
                let outcome = self
                    .particulate
                    .as_mut()
                    .map(|p| p.on_poll(&self.timers, &self.shared, now));
                if let Some(PollOutcome::Sampled(_)) = outcome {
                    self.publish();
                }
            }
            EventKind::PollCo2 => {
                let outcome = self
                    .co2
                    .as_mut()
                    .map(|p| p.on_poll(&self.timers, &self.shared, now));
                if let Some(PollOutcome::Sampled(_)) = outcome {
                    self.publish();
                }
            }
            EventKind::NameBurst => {
                self.arbiter
                    .on_name_burst(&mut self.ports.radio, &self.timers, now);
            }
            EventKind::NameBurstEnd => {
                let identity = &self.identity;
                let shared = &self.shared;
                self.arbiter.on_burst_end(&mut self.ports.radio, || {
                    encode_payload(identity, &shared.combine())
                });
            }
        }
    }

    /// Combine, encode, broadcast and hand off to the uplink.
    fn publish(&mut self) {
        let combined: CombinedReading = self.shared.combine();
        let payload = encode_payload(&self.identity, &combined);
        self.arbiter.on_publish(&mut self.ports.radio, &payload);
        if !self.ports.uplink.dispatch(&payload) {
            debug!("Sensors: uplink dropped payload seq={}", combined.sequence);
        }
        self.published = self.published.wrapping_add(1);
    }
}
