//! Sensirion SCD4x photoacoustic CO₂ sensor (SCD40 / SCD41).
//!
//! Periodic measurement mode delivers a new sample every 5 s. Raw
//! temperature and humidity ticks are converted to m°C and m%RH here so the
//! rest of the subsystem only sees integer milli-units.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use super::Co2Reading;
use super::sensirion::SensirionDevice;
use crate::app::ports::Peripheral;
use crate::error::SensorError;

pub const I2C_ADDRESS: u8 = 0x62;

const CMD_START_PERIODIC_MEASUREMENT: u16 = 0x21B1;
const CMD_READ_MEASUREMENT: u16 = 0xEC05;
const CMD_STOP_PERIODIC_MEASUREMENT: u16 = 0x3F86;
const CMD_GET_DATA_READY_STATUS: u16 = 0xE4B8;
const CMD_GET_SERIAL_NUMBER: u16 = 0x3682;
const CMD_REINIT: u16 = 0x3646;
const CMD_WAKE_UP: u16 = 0x36F6;

/// Ticks → m°C: `-45000 + 175000 · raw / 2^16`.
pub fn temperature_milli_c(raw: u16) -> i32 {
    ((21_875 * i32::from(raw)) >> 13) - 45_000
}

/// Ticks → m%RH: `100000 · raw / 2^16`.
pub fn humidity_milli_rh(raw: u16) -> i32 {
    (12_500 * i32::from(raw)) >> 13
}

pub struct Scd4x<I, D> {
    dev: SensirionDevice<I, D>,
    serial: Option<u64>,
}

impl<I: I2c, D: DelayNs> Scd4x<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            dev: SensirionDevice::new(i2c, delay, I2C_ADDRESS, "SCD4x"),
            serial: None,
        }
    }

    /// 48-bit serial read by the last successful probe.
    pub fn serial(&self) -> Option<u64> {
        self.serial
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        let mut word = [0u16; 1];
        self.dev.read_words(CMD_GET_DATA_READY_STATUS, 1, &mut word)?;
        Ok(word[0] & 0x07FF != 0)
    }
}

impl<I: I2c, D: DelayNs> Peripheral for Scd4x<I, D> {
    type Reading = Co2Reading;
    const NAME: &'static str = "SCD4x";

    fn probe(&mut self) -> bool {
        // The part never ACKs wake-up.
        self.dev.command_unacked(CMD_WAKE_UP, 20);
        if let Err(e) = self.dev.command(CMD_STOP_PERIODIC_MEASUREMENT, 500) {
            warn!("SCD4x: stop periodic measurement failed: {}", e);
            return false;
        }
        if let Err(e) = self.dev.command(CMD_REINIT, 20) {
            warn!("SCD4x: reinit failed: {}", e);
            return false;
        }
        let mut w = [0u16; 3];
        if let Err(e) = self.dev.read_words(CMD_GET_SERIAL_NUMBER, 1, &mut w) {
            warn!("SCD4x: serial number read failed: {}", e);
            return false;
        }
        let serial = (u64::from(w[0]) << 32) | (u64::from(w[1]) << 16) | u64::from(w[2]);
        self.serial = Some(serial);
        info!("SCD4x: serial 0x{:012X}", serial);
        true
    }

    fn start_sampling(&mut self) -> Result<(), SensorError> {
        self.dev.command(CMD_START_PERIODIC_MEASUREMENT, 0)
    }

    fn read_sample(&mut self) -> Result<Co2Reading, SensorError> {
        if !self.data_ready()? {
            return Err(SensorError::NotReady);
        }
        let mut w = [0u16; 3];
        self.dev.read_words(CMD_READ_MEASUREMENT, 1, &mut w)?;
        Ok(Co2Reading {
            co2: w[0],
            temperature: temperature_milli_c(w[1]),
            humidity: humidity_milli_rh(w[2]),
        })
    }
}
