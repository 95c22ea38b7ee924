//! Watchdog feeder.
//!
//! A periodic timer at one third of the trip timeout posts
//! [`EventKind::WatchdogFeed`]. Its handler is the only place the hardware
//! watchdog is reset, and it does not look at sensor health: a wedged
//! peripheral must not reboot the gateway, a wedged worker must.

use core::time::Duration;

use log::debug;

use crate::error::Result;
use crate::events::EventKind;
use crate::timers::{Periodic, TimerService};

use super::ports::WatchdogPort;

pub struct WatchdogFeeder {
    timer: Periodic,
    feeds: u64,
}

impl WatchdogFeeder {
    /// Create and start the feed timer.
    pub fn start(period: Duration, timers: &TimerService, now: Duration) -> Result<Self> {
        let timer = timers.create_periodic(EventKind::WatchdogFeed, period)?;
        timers.start_periodic(timer, now);
        debug!("Watchdog: feeding every {} ms", period.as_millis());
        Ok(Self { timer, feeds: 0 })
    }

    pub fn on_feed<W: WatchdogPort>(&mut self, watchdog: &mut W) {
        watchdog.feed();
        self.feeds = self.feeds.wrapping_add(1);
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }

    pub fn timer(&self) -> Periodic {
        self.timer
    }
}
