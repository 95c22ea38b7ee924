//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the sensor worker
//! stalls for longer than the configured trip timeout.
//!
//! TWDT subscriptions are per task, so the driver subscribes lazily on the
//! first `feed()`, from whichever thread feeds it (the sensor worker).

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::app::ports::WatchdogPort;

pub struct TaskWatchdog {
    timeout_ms: u32,
    /// `None` until the first feed attempted to subscribe.
    subscribed: Option<bool>,
    feeds: u64,
}

impl TaskWatchdog {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            subscribed: None,
            feeds: 0,
        }
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&self) -> bool {
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: self.timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!("Watchdog: reconfigure returned {} (may already be configured)", ret);
            }
            let ret = esp_task_wdt_add(core::ptr::null_mut());
            if ret != ESP_OK {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
                return false;
            }
        }
        info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", self.timeout_ms);
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&self) -> bool {
        info!("Watchdog(sim): {} ms timeout, no-op", self.timeout_ms);
        true
    }

    #[cfg(target_os = "espidf")]
    fn reset(&self) {
        let ret = unsafe { esp_task_wdt_reset() };
        if ret != ESP_OK {
            log::warn!("Watchdog: reset failed ({})", ret);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn reset(&self) {}
}

impl WatchdogPort for TaskWatchdog {
    fn feed(&mut self) {
        let subscribed = match self.subscribed {
            Some(s) => s,
            None => {
                let s = self.subscribe();
                self.subscribed = Some(s);
                s
            }
        };
        if subscribed {
            self.reset();
            self.feeds += 1;
        }
    }
}
