//! Subsystem configuration parameters
//!
//! Timing contract for the sensor pollers, the advertising arbiter and the
//! watchdog feeder. Defaults are the production constants; loading and
//! persisting a stored configuration is handled outside this crate.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    // --- Sensor polling ---
    /// Normal poll period of the particulate (SEN5x) peripheral (ms)
    pub particulate_poll_ms: u32,
    /// Normal poll period of the CO2 (SCD4x) peripheral (ms)
    pub co2_poll_ms: u32,
    /// Short re-check period after a transient read failure (ms)
    pub short_check_ms: u32,
    /// Consecutive failures tolerated before a full re-init
    pub max_retries: u8,

    // --- Advertising ---
    /// Period of the device-name burst (ms)
    pub name_burst_period_ms: u32,
    /// Duration of one device-name burst (ms)
    pub name_burst_duration_ms: u32,
    /// Data advertising interval, 0.625 ms units
    pub data_adv_interval: u16,
    /// Name-burst advertising interval, 0.625 ms units
    pub name_adv_interval: u16,

    // --- Watchdog ---
    /// Hardware watchdog trip timeout (ms)
    pub watchdog_timeout_ms: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            // Polling
            particulate_poll_ms: 1000,
            co2_poll_ms: 5000,
            short_check_ms: 100,
            max_retries: 10,

            // Advertising
            name_burst_period_ms: 3011, // co-prime with the poll periods
            name_burst_duration_ms: 100,
            data_adv_interval: 338, // 211.25 ms
            name_adv_interval: 32,  // 20 ms

            // Watchdog
            watchdog_timeout_ms: 3000,
        }
    }
}

/// Poll timing for one peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub normal_period: Duration,
    pub short_check_period: Duration,
    pub max_retries: u8,
}

impl PollSchedule {
    /// Build a schedule, rejecting a short period that is not strictly
    /// below the normal one.
    pub fn new(normal_ms: u32, short_ms: u32, max_retries: u8) -> Result<Self> {
        if short_ms == 0 || short_ms >= normal_ms {
            return Err(Error::Config("short_check must be in 1..normal_period"));
        }
        if max_retries == 0 {
            return Err(Error::Config("max_retries must be > 0"));
        }
        Ok(Self {
            normal_period: Duration::from_millis(u64::from(normal_ms)),
            short_check_period: Duration::from_millis(u64::from(short_ms)),
            max_retries,
        })
    }

    /// Delay after a good sample, compensating for the short re-checks
    /// already spent waiting on the data-ready flag.
    pub fn after_success(&self) -> Duration {
        self.normal_period.saturating_sub(self.short_check_period)
    }

    /// Delay after a re-init.
    pub fn backoff(&self) -> Duration {
        self.normal_period.saturating_mul(2)
    }
}

impl GatewayConfig {
    /// Check every cross-field invariant.
    pub fn validate(&self) -> Result<()> {
        self.particulate_schedule()?;
        self.co2_schedule()?;
        if self.name_burst_duration_ms == 0 || self.name_burst_duration_ms >= self.name_burst_period_ms {
            return Err(Error::Config("name burst must be shorter than its period"));
        }
        if self.data_adv_interval < 0x20 || self.name_adv_interval < 0x20 {
            return Err(Error::Config("advertising interval below 20 ms"));
        }
        if self.watchdog_timeout_ms < 3 {
            return Err(Error::Config("watchdog timeout too short"));
        }
        Ok(())
    }

    pub fn particulate_schedule(&self) -> Result<PollSchedule> {
        PollSchedule::new(self.particulate_poll_ms, self.short_check_ms, self.max_retries)
    }

    pub fn co2_schedule(&self) -> Result<PollSchedule> {
        PollSchedule::new(self.co2_poll_ms, self.short_check_ms, self.max_retries)
    }

    /// Feed period: one third of the trip timeout, so two feeds may be lost
    /// before the watchdog bites.
    pub fn watchdog_feed_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.watchdog_timeout_ms / 3))
    }

    pub fn name_burst_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.name_burst_period_ms))
    }

    pub fn name_burst_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.name_burst_duration_ms))
    }
}
