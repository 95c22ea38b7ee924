//! Sensirion I2C word framing.
//!
//! Both peripherals speak the same protocol: a 16-bit big-endian command,
//! an execution delay, then a response of 16-bit words each followed by a
//! CRC-8 (polynomial 0x31, init 0xFF). Every command is attempted up to
//! [`NUM_RETRIES`] times before the error is reported.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;

use crate::error::SensorError;

/// Attempts per command before giving up.
pub const NUM_RETRIES: u8 = 3;

/// Largest response handled (SEN5x product name: 16 words).
pub const MAX_WORDS: usize = 16;

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// CRC-8 over one word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Serialize `words` into Sensirion framing: each word big-endian plus CRC.
pub fn encode_words(words: &[u16], out: &mut [u8]) -> usize {
    let mut n = 0;
    for (w, chunk) in words.iter().zip(out.chunks_exact_mut(3)) {
        let be = w.to_be_bytes();
        chunk[0] = be[0];
        chunk[1] = be[1];
        chunk[2] = crc8(&be);
        n += 3;
    }
    n
}

/// Parse a framed response into words, verifying every CRC.
pub fn decode_words(raw: &[u8], words: &mut [u16]) -> Result<(), SensorError> {
    for (chunk, w) in raw.chunks_exact(3).zip(words.iter_mut()) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(SensorError::Crc);
        }
        *w = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}

/// One Sensirion device on a (possibly shared) I2C bus.
pub struct SensirionDevice<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    tag: &'static str,
}

impl<I: I2c, D: DelayNs> SensirionDevice<I, D> {
    pub fn new(i2c: I, delay: D, address: u8, tag: &'static str) -> Self {
        Self {
            i2c,
            delay,
            address,
            tag,
        }
    }

    fn retry<T>(
        &mut self,
        what: &str,
        mut op: impl FnMut(&mut Self) -> Result<T, SensorError>,
    ) -> Result<T, SensorError> {
        let mut last = SensorError::Bus;
        for attempt in 0..NUM_RETRIES {
            match op(self) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    debug!("{}: {}[retry={}]: {}", self.tag, what, attempt, e);
                    last = e;
                }
            }
        }
        Err(last)
    }

    /// Send a bare command, then wait `exec_ms`.
    pub fn command(&mut self, cmd: u16, exec_ms: u32) -> Result<(), SensorError> {
        self.retry("command", |dev| {
            dev.i2c
                .write(dev.address, &cmd.to_be_bytes())
                .map_err(|_| SensorError::Bus)?;
            dev.delay.delay_ms(exec_ms);
            Ok(())
        })
    }

    /// Send a command, wait `exec_ms`, then read `words.len()` framed words.
    pub fn read_words(
        &mut self,
        cmd: u16,
        exec_ms: u32,
        words: &mut [u16],
    ) -> Result<(), SensorError> {
        let len = words.len().min(MAX_WORDS) * 3;
        self.retry("read", |dev| {
            let mut raw = [0u8; MAX_WORDS * 3];
            dev.i2c
                .write(dev.address, &cmd.to_be_bytes())
                .map_err(|_| SensorError::Bus)?;
            dev.delay.delay_ms(exec_ms);
            dev.i2c
                .read(dev.address, &mut raw[..len])
                .map_err(|_| SensorError::Bus)?;
            decode_words(&raw[..len], words)
        })
    }

    /// Write a command and ignore the result. Used for wake-up, which the
    /// part never acknowledges.
    pub fn command_unacked(&mut self, cmd: u16, exec_ms: u32) {
        let _ = self.i2c.write(self.address, &cmd.to_be_bytes());
        self.delay.delay_ms(exec_ms);
    }
}

/// Unpack big-endian ASCII bytes from words, stopping at the first NUL.
pub fn words_to_ascii<const N: usize>(words: &[u16]) -> heapless::String<N> {
    let mut s = heapless::String::new();
    for &w in words {
        for b in w.to_be_bytes() {
            if b == 0 || !b.is_ascii() || s.push(b as char).is_err() {
                return s;
            }
        }
    }
    s
}
