//! Sensirion SEN5x environmental sensor node (SEN50 / SEN54 / SEN55).
//!
//! PM1.0..PM10 mass concentration, humidity, temperature, VOC and NOx
//! indices. SEN50 reports only PM channels; SEN54 adds RH/T/VOC. Missing
//! channels come back as their sentinel.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use super::ParticulateReading;
use super::sensirion::{SensirionDevice, words_to_ascii};
use crate::app::ports::Peripheral;
use crate::error::SensorError;

pub const I2C_ADDRESS: u8 = 0x69;

const CMD_START_MEASUREMENT: u16 = 0x0021;
const CMD_READ_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASURED_VALUES: u16 = 0x03C4;
const CMD_GET_PRODUCT_NAME: u16 = 0xD014;
const CMD_GET_SERIAL_NUMBER: u16 = 0xD033;
const CMD_DEVICE_RESET: u16 = 0xD304;

/// Detected product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sen5xVariant {
    Sen50,
    Sen54,
    Sen55,
}

pub struct Sen5x<I, D> {
    dev: SensirionDevice<I, D>,
    variant: Option<Sen5xVariant>,
}

impl<I: I2c, D: DelayNs> Sen5x<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            dev: SensirionDevice::new(i2c, delay, I2C_ADDRESS, "SEN5x"),
            variant: None,
        }
    }

    /// Variant identified by the last successful probe.
    pub fn variant(&self) -> Option<Sen5xVariant> {
        self.variant
    }

    fn product_name(&mut self) -> Result<heapless::String<32>, SensorError> {
        let mut words = [0u16; 16];
        self.dev.read_words(CMD_GET_PRODUCT_NAME, 50, &mut words)?;
        Ok(words_to_ascii(&words))
    }

    fn serial_number(&mut self) -> Result<heapless::String<32>, SensorError> {
        let mut words = [0u16; 16];
        self.dev.read_words(CMD_GET_SERIAL_NUMBER, 50, &mut words)?;
        Ok(words_to_ascii(&words))
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        let mut word = [0u16; 1];
        self.dev.read_words(CMD_READ_DATA_READY, 20, &mut word)?;
        Ok(word[0] & 0x00FF != 0)
    }
}

impl<I: I2c, D: DelayNs> Peripheral for Sen5x<I, D> {
    type Reading = ParticulateReading;
    const NAME: &'static str = "SEN5x";

    fn probe(&mut self) -> bool {
        if let Err(e) = self.dev.command(CMD_DEVICE_RESET, 200) {
            warn!("SEN5x: device reset failed: {}", e);
            return false;
        }
        let name = match self.product_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("SEN5x: product name read failed: {}", e);
                return false;
            }
        };
        self.variant = match name.as_str() {
            "SEN50" => Some(Sen5xVariant::Sen50),
            "SEN54" => Some(Sen5xVariant::Sen54),
            "SEN55" => Some(Sen5xVariant::Sen55),
            other => {
                warn!("SEN5x: unexpected product name '{}'", other);
                return false;
            }
        };
        match self.serial_number() {
            Ok(sn) => info!("SEN5x: {} serial {}", name, sn),
            Err(e) => info!("SEN5x: {} (serial unavailable: {})", name, e),
        }
        true
    }

    fn start_sampling(&mut self) -> Result<(), SensorError> {
        self.dev.command(CMD_START_MEASUREMENT, 50)
    }

    fn read_sample(&mut self) -> Result<ParticulateReading, SensorError> {
        if !self.data_ready()? {
            return Err(SensorError::NotReady);
        }
        let mut w = [0u16; 8];
        self.dev.read_words(CMD_READ_MEASURED_VALUES, 20, &mut w)?;
        Ok(ParticulateReading {
            pm1p0: w[0],
            pm2p5: w[1],
            pm4p0: w[2],
            pm10p0: w[3],
            humidity: w[4] as i16,
            temperature: w[5] as i16,
            voc_index: w[6] as i16,
            nox_index: w[7] as i16,
        })
    }
}
