//! Advertising slot arbitration.
//!
//! The BLE stack exposes one advertising slot. Two users share it:
//!
//! - **Data**: every successful publish puts the fresh sensor payload on
//!   air, replacing whatever is there.
//! - **Name burst**: a periodic timer pre-empts the slot with the device
//!   name for a short burst so scanners can discover the gateway. When the
//!   burst-end one-shot fires, the data payload is rebuilt from the shared
//!   state and restored.
//!
//! ```text
//!          publish                 NameBurst               NameBurstEnd
//!   Off ───────────▶ Data ──────────────────▶ NameBurst ─────────────▶ Data
//!    │                 ▲                          │          (had data)
//!    │   NameBurst     │ publish                  │
//!    └───────────▶ NameBurst ─────────────────────┴───────────────────▶ Off
//!                                                          (no data yet)
//! ```
//!
//! Every transmit goes through the [`ReadyGate`]; until the stack reports
//! ready, requests are dropped without touching the slot state.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use log::{debug, info, warn};

use crate::adapters::device_id::DeviceName;
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::events::EventKind;
use crate::timers::{OneShot, Periodic, TimerService};

use super::payload::Payload;
use super::ports::{AdvFrame, RadioPort};

// ── Ready gate ────────────────────────────────────────────────

/// One-way "radio stack ready" latch. Starts closed, opens exactly once.
#[derive(Debug, Default)]
pub struct ReadyGate(AtomicBool);

impl ReadyGate {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn open(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Slot ──────────────────────────────────────────────────────

/// What currently occupies the advertising slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingSlot {
    Off,
    Data,
    NameBurst,
}

// ── Arbiter ───────────────────────────────────────────────────

pub struct AdvertisingArbiter {
    slot: AdvertisingSlot,
    name: DeviceName,
    data_interval: u16,
    name_interval: u16,
    burst_duration: Duration,
    burst_timer: Periodic,
    burst_end: OneShot,
    has_data: bool,
}

impl AdvertisingArbiter {
    /// Create the burst timers and start the periodic one.
    pub fn new(
        config: &GatewayConfig,
        name: DeviceName,
        timers: &TimerService,
        now: Duration,
    ) -> Result<Self> {
        let burst_timer = timers.create_periodic(EventKind::NameBurst, config.name_burst_period())?;
        let burst_end = timers.create_one_shot(EventKind::NameBurstEnd)?;
        timers.start_periodic(burst_timer, now);
        Ok(Self {
            slot: AdvertisingSlot::Off,
            name,
            data_interval: config.data_adv_interval,
            name_interval: config.name_adv_interval,
            burst_duration: config.name_burst_duration(),
            burst_timer,
            burst_end,
            has_data: false,
        })
    }

    pub fn slot(&self) -> AdvertisingSlot {
        self.slot
    }

    pub fn device_name(&self) -> &str {
        &self.name
    }

    pub fn burst_timer(&self) -> Periodic {
        self.burst_timer
    }

    pub fn burst_end_timer(&self) -> OneShot {
        self.burst_end
    }

    /// Put `frame` on air if the radio is ready. Returns the new slot, or
    /// `None` when the request was dropped.
    fn transmit<R: RadioPort>(
        &mut self,
        radio: &mut R,
        frame: AdvFrame<'_>,
        interval: u16,
        slot: AdvertisingSlot,
    ) -> Option<AdvertisingSlot> {
        if !radio.is_ready() {
            debug!("Adv: radio not ready, dropping {:?}", slot);
            return None;
        }
        match radio.start_advertising(frame, interval) {
            Ok(()) => self.slot = slot,
            Err(e) => {
                warn!("Adv: {:?} start failed: {}", slot, e);
                self.slot = AdvertisingSlot::Off;
            }
        }
        Some(self.slot)
    }

    /// A fresh payload was published: broadcast it, replacing anything on air.
    pub fn on_publish<R: RadioPort>(&mut self, radio: &mut R, payload: &Payload) {
        self.has_data = true;
        self.transmit(
            radio,
            AdvFrame::Data(payload),
            self.data_interval,
            AdvertisingSlot::Data,
        );
    }

    /// Pre-empt the slot with the device name and arm the burst end.
    pub fn on_name_burst<R: RadioPort>(
        &mut self,
        radio: &mut R,
        timers: &TimerService,
        now: Duration,
    ) {
        let name = self.name.clone();
        if self
            .transmit(
                radio,
                AdvFrame::Name(&name),
                self.name_interval,
                AdvertisingSlot::NameBurst,
            )
            .is_some()
        {
            timers.start_once(self.burst_end, self.burst_duration, now);
        }
    }

    /// Burst over: restore data (rebuilt by `rebuild`) or go quiet if no
    /// data has ever been published.
    pub fn on_burst_end<R: RadioPort>(&mut self, radio: &mut R, rebuild: impl FnOnce() -> Payload) {
        if self.has_data {
            let payload = rebuild();
            self.transmit(
                radio,
                AdvFrame::Data(&payload),
                self.data_interval,
                AdvertisingSlot::Data,
            );
            return;
        }
        if !radio.is_ready() {
            return;
        }
        if let Err(e) = radio.stop_advertising() {
            warn!("Adv: stop failed: {}", e);
        }
        if self.slot != AdvertisingSlot::Off {
            info!("Adv: no data yet, slot off");
        }
        self.slot = AdvertisingSlot::Off;
    }
}
