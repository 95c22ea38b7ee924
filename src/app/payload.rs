//! Fixed-width advertisement payload.
//!
//! ```text
//!  0      3            9     11                                      55
//!  ┌──────┬────────────┬─────┬───────────────────────────────────────┐
//!  │prefix│ device MAC │ seq │ 11 × f32 big-endian channel values    │
//!  └──────┴────────────┴─────┴───────────────────────────────────────┘
//! ```
//!
//! Prefix is the manufacturer ID (0x0499, little-endian as in the AD
//! structure) followed by the format byte [`FORMAT`]. Formats 0x03, 0x05,
//! 0x06, 0xC5, 0xE0, 0xE1 and 0xF0 already belong to other layouts under this
//! manufacturer ID and must not be reused. Every integer and float
//! field is big-endian. A channel whose raw value is its sentinel, or whose
//! scaled value falls outside the channel's range, is encoded as NaN.

use core::fmt;

use crate::adapters::device_id::{DeviceIdentity, MacAddress};
use crate::sensors::{I16_INVALID, I32_INVALID, U16_INVALID};

use super::measurement::CombinedReading;

// ═══════════════════════════════════════════════════════════════
//  Layout
// ═══════════════════════════════════════════════════════════════

pub const MANUFACTURER_ID: u16 = 0x0499;
/// Format byte of this layout.
pub const FORMAT: u8 = 0xA1;
/// Format bytes with a different layout under [`MANUFACTURER_ID`].
pub const FOREIGN_FORMATS: [u8; 7] = [0x03, 0x05, 0x06, 0xC5, 0xE0, 0xE1, 0xF0];

pub const PREFIX: [u8; 3] = {
    let id = MANUFACTURER_ID.to_le_bytes();
    [id[0], id[1], FORMAT]
};
pub const CHANNEL_COUNT: usize = 11;

pub const OFFSET_MAC: usize = PREFIX.len();
pub const OFFSET_SEQUENCE: usize = OFFSET_MAC + 6;
pub const OFFSET_CHANNELS: usize = OFFSET_SEQUENCE + 2;
pub const PAYLOAD_LEN: usize = OFFSET_CHANNELS + CHANNEL_COUNT * 4;

const _: () = assert!(PAYLOAD_LEN == 55);
const _: () = assert!(OFFSET_CHANNELS == 11);
const _: () = {
    let mut i = 0;
    while i < FOREIGN_FORMATS.len() {
        assert!(FOREIGN_FORMATS[i] != FORMAT);
        i += 1;
    }
};

pub type Payload = [u8; PAYLOAD_LEN];

/// Channel order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Pm1p0 = 0,
    Pm2p5 = 1,
    Pm4p0 = 2,
    Pm10p0 = 3,
    Humidity = 4,
    Temperature = 5,
    VocIndex = 6,
    NoxIndex = 7,
    Co2 = 8,
    Co2Temperature = 9,
    Co2Humidity = 10,
}

/// Scale divisor and valid range (inclusive, after scaling) of one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSpec {
    pub divisor: f32,
    pub min: f32,
    pub max: f32,
}

impl ChannelSpec {
    const fn new(divisor: f32, min: f32, max: f32) -> Self {
        Self { divisor, min, max }
    }

    fn scale(&self, raw: f32) -> f32 {
        let v = raw / self.divisor;
        if v >= self.min && v <= self.max { v } else { f32::NAN }
    }
}

pub const CHANNEL_SPECS: [ChannelSpec; CHANNEL_COUNT] = [
    ChannelSpec::new(10.0, 0.0, 1000.0),     // PM1.0 µg/m³
    ChannelSpec::new(10.0, 0.0, 1000.0),     // PM2.5
    ChannelSpec::new(10.0, 0.0, 1000.0),     // PM4.0
    ChannelSpec::new(10.0, 0.0, 1000.0),     // PM10
    ChannelSpec::new(100.0, 0.0, 100.0),     // %RH
    ChannelSpec::new(200.0, -40.0, 125.0),   // °C
    ChannelSpec::new(10.0, 1.0, 500.0),      // VOC index
    ChannelSpec::new(10.0, 1.0, 500.0),      // NOx index
    ChannelSpec::new(1.0, 0.0, 40_000.0),    // CO₂ ppm
    ChannelSpec::new(1000.0, -40.0, 125.0),  // CO₂ sensor °C
    ChannelSpec::new(1000.0, 0.0, 100.0),    // CO₂ sensor %RH
];

fn scale_u16(raw: u16, ch: Channel) -> f32 {
    if raw == U16_INVALID {
        return f32::NAN;
    }
    CHANNEL_SPECS[ch as usize].scale(f32::from(raw))
}

fn scale_i16(raw: i16, ch: Channel) -> f32 {
    if raw == I16_INVALID {
        return f32::NAN;
    }
    CHANNEL_SPECS[ch as usize].scale(f32::from(raw))
}

fn scale_i32(raw: i32, ch: Channel) -> f32 {
    if raw == I32_INVALID {
        return f32::NAN;
    }
    CHANNEL_SPECS[ch as usize].scale(raw as f32)
}

// ═══════════════════════════════════════════════════════════════
//  Encoder
// ═══════════════════════════════════════════════════════════════

/// Sequential big-endian writer over a payload buffer.
struct PayloadWriter {
    buf: Payload,
    pos: usize,
}

impl PayloadWriter {
    fn new() -> Self {
        Self {
            buf: [0; PAYLOAD_LEN],
            pos: 0,
        }
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u16_be(&mut self, v: u16) {
        self.bytes(&v.to_be_bytes());
    }

    fn f32_be(&mut self, v: f32) {
        self.bytes(&v.to_be_bytes());
    }

    fn finish(self) -> Payload {
        debug_assert_eq!(self.pos, PAYLOAD_LEN);
        self.buf
    }
}

/// Encode one combined reading. Pure: same inputs, same bytes.
pub fn encode_payload(identity: &DeviceIdentity, reading: &CombinedReading) -> Payload {
    let p = &reading.particulate;
    let c = &reading.co2;

    let mut w = PayloadWriter::new();
    w.bytes(&PREFIX);
    w.bytes(identity.mac());
    w.u16_be(reading.sequence);

    w.f32_be(scale_u16(p.pm1p0, Channel::Pm1p0));
    w.f32_be(scale_u16(p.pm2p5, Channel::Pm2p5));
    w.f32_be(scale_u16(p.pm4p0, Channel::Pm4p0));
    w.f32_be(scale_u16(p.pm10p0, Channel::Pm10p0));
    w.f32_be(scale_i16(p.humidity, Channel::Humidity));
    w.f32_be(scale_i16(p.temperature, Channel::Temperature));
    w.f32_be(scale_i16(p.voc_index, Channel::VocIndex));
    w.f32_be(scale_i16(p.nox_index, Channel::NoxIndex));
    w.f32_be(scale_u16(c.co2, Channel::Co2));
    w.f32_be(scale_i32(c.temperature, Channel::Co2Temperature));
    w.f32_be(scale_i32(c.humidity, Channel::Co2Humidity));

    w.finish()
}

// ═══════════════════════════════════════════════════════════════
//  Decoder
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Input is not exactly [`PAYLOAD_LEN`] bytes.
    Length(usize),
    /// Manufacturer ID or format byte mismatch.
    Prefix,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "payload length {} (expected {})", n, PAYLOAD_LEN),
            Self::Prefix => write!(f, "unknown payload prefix"),
        }
    }
}

/// Decoded view of a payload.
#[derive(Debug, Clone, Copy)]
pub struct DecodedPayload {
    pub identity: DeviceIdentity,
    pub sequence: u16,
    pub channels: [f32; CHANNEL_COUNT],
}

impl DecodedPayload {
    /// Value of `ch`, `None` when the payload carries NaN.
    pub fn get(&self, ch: Channel) -> Option<f32> {
        let v = self.channels[ch as usize];
        (!v.is_nan()).then_some(v)
    }
}

pub fn decode_payload(data: &[u8]) -> Result<DecodedPayload, PayloadError> {
    if data.len() != PAYLOAD_LEN {
        return Err(PayloadError::Length(data.len()));
    }
    if data[..OFFSET_MAC] != PREFIX {
        return Err(PayloadError::Prefix);
    }
    let mut mac: MacAddress = [0; 6];
    mac.copy_from_slice(&data[OFFSET_MAC..OFFSET_SEQUENCE]);
    let sequence = u16::from_be_bytes([data[OFFSET_SEQUENCE], data[OFFSET_SEQUENCE + 1]]);

    let mut channels = [f32::NAN; CHANNEL_COUNT];
    for (v, chunk) in channels
        .iter_mut()
        .zip(data[OFFSET_CHANNELS..].chunks_exact(4))
    {
        *v = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    Ok(DecodedPayload {
        identity: DeviceIdentity::new(mac),
        sequence,
        channels,
    })
}
