//! Uplink hand-off channel.
//!
//! Every published payload is also offered to a bounded `embassy-sync`
//! channel drained by a forwarding task (the mesh/serial uplink on the
//! target, a logger on the bench). The sensor worker never blocks on it: a
//! full channel drops the payload.
//!
//! ```text
//! ┌───────────────┐  Payload  ┌──────────────────┐
//! │ Sensor worker │──────────▶│ Uplink forwarder │
//! │ (try_send)    │           │ (receive)        │
//! └───────────────┘           └──────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::debug;

use crate::app::payload::Payload;
use crate::app::ports::UplinkPort;

/// Channel depth for outbound payloads.
pub const UPLINK_DEPTH: usize = 4;

pub type UplinkChannel = Channel<CriticalSectionRawMutex, Payload, UPLINK_DEPTH>;

/// Process-wide uplink channel.
pub static UPLINK: UplinkChannel = Channel::new();

/// Producer side handed to the sensor subsystem.
#[derive(Clone)]
pub struct UplinkSender<'a> {
    channel: &'a UplinkChannel,
    dropped: u32,
}

impl<'a> UplinkSender<'a> {
    pub fn new(channel: &'a UplinkChannel) -> Self {
        Self {
            channel,
            dropped: 0,
        }
    }

    /// Payloads refused because the channel was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl UplinkSender<'static> {
    pub fn global() -> Self {
        Self::new(&UPLINK)
    }
}

impl UplinkPort for UplinkSender<'_> {
    fn dispatch(&mut self, payload: &Payload) -> bool {
        match self.channel.try_send(*payload) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                debug!("Uplink: channel full, payload dropped");
                false
            }
        }
    }
}
