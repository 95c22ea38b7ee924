//! Sensor readings and the Sensirion peripheral drivers.
//!
//! Each reading carries raw integer channels exactly as the peripheral
//! reports them, plus a reserved sentinel per channel meaning "no valid
//! sample". Scaling to engineering units happens only at the edges
//! (logging and payload encoding).
//!
//! | Channel           | Raw type | Sentinel   | Scale   |
//! |-------------------|----------|------------|---------|
//! | PM1.0..PM10 µg/m³ | `u16`    | `0xFFFF`   | ÷ 10    |
//! | Humidity %RH      | `i16`    | `0x7FFF`   | ÷ 100   |
//! | Temperature °C    | `i16`    | `0x7FFF`   | ÷ 200   |
//! | VOC / NOx index   | `i16`    | `0x7FFF`   | ÷ 10    |
//! | CO₂ ppm           | `u16`    | `0xFFFF`   | ÷ 1     |
//! | CO₂ temp/humidity | `i32`    | `i32::MIN` | ÷ 1000  |

pub mod scd4x;
pub mod sen5x;
pub mod sensirion;

use core::fmt;

/// Sentinel for unsigned 16-bit channels.
pub const U16_INVALID: u16 = 0xFFFF;
/// Sentinel for signed 16-bit channels.
pub const I16_INVALID: i16 = 0x7FFF;
/// Sentinel for signed 32-bit milli-unit channels.
pub const I32_INVALID: i32 = i32::MIN;

// ── Particulate / VOC / NOx / RH / T ──────────────────────────

/// One SEN5x sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticulateReading {
    pub pm1p0: u16,
    pub pm2p5: u16,
    pub pm4p0: u16,
    pub pm10p0: u16,
    pub humidity: i16,
    pub temperature: i16,
    pub voc_index: i16,
    pub nox_index: i16,
}

impl ParticulateReading {
    /// Every channel at its sentinel.
    pub const INVALID: Self = Self {
        pm1p0: U16_INVALID,
        pm2p5: U16_INVALID,
        pm4p0: U16_INVALID,
        pm10p0: U16_INVALID,
        humidity: I16_INVALID,
        temperature: I16_INVALID,
        voc_index: I16_INVALID,
        nox_index: I16_INVALID,
    };

    pub fn is_invalid(&self) -> bool {
        *self == Self::INVALID
    }
}

impl Default for ParticulateReading {
    fn default() -> Self {
        Self::INVALID
    }
}

// ── CO2 ───────────────────────────────────────────────────────

/// One SCD4x sample. Temperature in m°C, humidity in m%RH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Reading {
    pub co2: u16,
    pub temperature: i32,
    pub humidity: i32,
}

impl Co2Reading {
    pub const INVALID: Self = Self {
        co2: U16_INVALID,
        temperature: I32_INVALID,
        humidity: I32_INVALID,
    };

    pub fn is_invalid(&self) -> bool {
        *self == Self::INVALID
    }
}

impl Default for Co2Reading {
    fn default() -> Self {
        Self::INVALID
    }
}

// ── Tagged reading ────────────────────────────────────────────

/// A reading from either peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    Particulate(ParticulateReading),
    Co2(Co2Reading),
}

impl From<ParticulateReading> for SensorReading {
    fn from(r: ParticulateReading) -> Self {
        Self::Particulate(r)
    }
}

impl From<Co2Reading> for SensorReading {
    fn from(r: Co2Reading) -> Self {
        Self::Co2(r)
    }
}

// ── Log formatting ────────────────────────────────────────────

/// Scaled channel value that prints `n/a` when the raw value is its sentinel.
struct Scaled {
    value: Option<f32>,
    unit: &'static str,
}

impl Scaled {
    fn u16(raw: u16, div: f32, unit: &'static str) -> Self {
        Self {
            value: (raw != U16_INVALID).then(|| raw as f32 / div),
            unit,
        }
    }

    fn i16(raw: i16, div: f32, unit: &'static str) -> Self {
        Self {
            value: (raw != I16_INVALID).then(|| raw as f32 / div),
            unit,
        }
    }

    fn i32(raw: i32, div: f32, unit: &'static str) -> Self {
        Self {
            value: (raw != I32_INVALID).then(|| raw as f32 / div),
            unit,
        }
    }
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) if self.unit.is_empty() => write!(f, "{v:.1}"),
            Some(v) => write!(f, "{v:.1} {}", self.unit),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for ParticulateReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PM1.0={} PM2.5={} PM4.0={} PM10={} RH={} T={} VOC={} NOx={}",
            Scaled::u16(self.pm1p0, 10.0, "ug/m3"),
            Scaled::u16(self.pm2p5, 10.0, "ug/m3"),
            Scaled::u16(self.pm4p0, 10.0, "ug/m3"),
            Scaled::u16(self.pm10p0, 10.0, "ug/m3"),
            Scaled::i16(self.humidity, 100.0, "%RH"),
            Scaled::i16(self.temperature, 200.0, "C"),
            Scaled::i16(self.voc_index, 10.0, ""),
            Scaled::i16(self.nox_index, 10.0, ""),
        )
    }
}

impl fmt::Display for Co2Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CO2={} T={} RH={}",
            Scaled::u16(self.co2, 1.0, "ppm"),
            Scaled::i32(self.temperature, 1000.0, "C"),
            Scaled::i32(self.humidity, 1000.0, "%RH"),
        )
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Particulate(r) => r.fmt(f),
            Self::Co2(r) => r.fmt(f),
        }
    }
}
