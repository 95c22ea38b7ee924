//! Mock hardware for integration tests.
//!
//! Every mock keeps its state behind an `Arc` so a test can hand one clone
//! to the subsystem and keep another to inspect the full call history.

#![allow(dead_code)]

use core::time::Duration;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use airq_gateway::adapters::device_id::DeviceIdentity;
use airq_gateway::app::payload::Payload;
use airq_gateway::app::ports::{AdvFrame, Peripheral, RadioPort, UplinkPort, WatchdogPort};
use airq_gateway::app::subsystem::{Ports, SensorSubsystem};
use airq_gateway::config::GatewayConfig;
use airq_gateway::error::{RadioError, SensorError};
use airq_gateway::sensors::{Co2Reading, ParticulateReading, SensorReading};
use airq_gateway::sensors::sensirion::encode_words;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

// ── MockPeripheral ────────────────────────────────────────────

pub struct PeripheralState<R> {
    pub present: bool,
    /// Results returned by successive reads; `fallback` once drained.
    pub script: VecDeque<Result<R, SensorError>>,
    pub fallback: Result<R, SensorError>,
    pub probes: u32,
    pub starts: u32,
    pub reads: u32,
}

pub struct MockPeripheral<R> {
    state: Arc<Mutex<PeripheralState<R>>>,
}

impl<R> Clone for MockPeripheral<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Copy> MockPeripheral<R> {
    pub fn present(fallback: Result<R, SensorError>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PeripheralState {
                present: true,
                script: VecDeque::new(),
                fallback,
                probes: 0,
                starts: 0,
                reads: 0,
            })),
        }
    }

    pub fn absent() -> Self {
        let mock = Self::present(Err(SensorError::NotPresent));
        lock(&mock.state).present = false;
        mock
    }

    pub fn script(&self, results: impl IntoIterator<Item = Result<R, SensorError>>) {
        lock(&self.state).script.extend(results);
    }

    pub fn set_fallback(&self, fallback: Result<R, SensorError>) {
        lock(&self.state).fallback = fallback;
    }

    pub fn probes(&self) -> u32 {
        lock(&self.state).probes
    }

    pub fn starts(&self) -> u32 {
        lock(&self.state).starts
    }

    pub fn reads(&self) -> u32 {
        lock(&self.state).reads
    }
}

impl<R> Peripheral for MockPeripheral<R>
where
    R: Copy + Into<SensorReading>,
{
    type Reading = R;
    const NAME: &'static str = "MOCK";

    fn probe(&mut self) -> bool {
        let mut s = lock(&self.state);
        s.probes += 1;
        s.present
    }

    fn start_sampling(&mut self) -> Result<(), SensorError> {
        let mut s = lock(&self.state);
        s.starts += 1;
        if s.present { Ok(()) } else { Err(SensorError::NotPresent) }
    }

    fn read_sample(&mut self) -> Result<R, SensorError> {
        let mut s = lock(&self.state);
        s.reads += 1;
        let fallback = s.fallback;
        s.script.pop_front().unwrap_or(fallback)
    }
}

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum OnAir {
    Data(Payload),
    Name(String),
}

impl OnAir {
    fn from_frame(frame: AdvFrame<'_>) -> Self {
        match frame {
            AdvFrame::Data(p) => Self::Data(*p),
            AdvFrame::Name(n) => Self::Name(n.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Start { frame: OnAir, interval: u16 },
    Stop,
}

#[derive(Default)]
pub struct RadioState {
    pub ready: bool,
    pub fail_starts: bool,
    pub calls: Vec<RadioCall>,
    pub on_air: Option<(OnAir, u16)>,
}

#[derive(Clone, Default)]
pub struct MockRadio {
    state: Arc<Mutex<RadioState>>,
}

impl MockRadio {
    pub fn ready() -> Self {
        let radio = Self::default();
        radio.set_ready(true);
        radio
    }

    pub fn set_ready(&self, ready: bool) {
        lock(&self.state).ready = ready;
    }

    pub fn fail_starts(&self, fail: bool) {
        lock(&self.state).fail_starts = fail;
    }

    pub fn on_air(&self) -> Option<OnAir> {
        lock(&self.state).on_air.as_ref().map(|(f, _)| f.clone())
    }

    pub fn on_air_interval(&self) -> Option<u16> {
        lock(&self.state).on_air.as_ref().map(|(_, i)| *i)
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

impl RadioPort for MockRadio {
    fn start_advertising(&mut self, frame: AdvFrame<'_>, interval: u16) -> Result<(), RadioError> {
        let mut s = lock(&self.state);
        if s.fail_starts {
            return Err(RadioError::StartFailed(-1));
        }
        let frame = OnAir::from_frame(frame);
        s.calls.push(RadioCall::Start {
            frame: frame.clone(),
            interval,
        });
        s.on_air = Some((frame, interval));
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), RadioError> {
        let mut s = lock(&self.state);
        s.calls.push(RadioCall::Stop);
        s.on_air = None;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        lock(&self.state).ready
    }
}

// ── MockUplink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockUplink {
    sent: Arc<Mutex<Vec<Payload>>>,
    refuse: Arc<Mutex<bool>>,
}

impl MockUplink {
    pub fn sent(&self) -> Vec<Payload> {
        lock(&self.sent).clone()
    }

    pub fn refuse(&self, refuse: bool) {
        *lock(&self.refuse) = refuse;
    }
}

impl UplinkPort for MockUplink {
    fn dispatch(&mut self, payload: &Payload) -> bool {
        if *lock(&self.refuse) {
            return false;
        }
        lock(&self.sent).push(*payload);
        true
    }
}

// ── MockWatchdog ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockWatchdog {
    feeds: Arc<AtomicU64>,
}

impl MockWatchdog {
    pub fn feeds(&self) -> u64 {
        self.feeds.load(Ordering::Relaxed)
    }
}

impl WatchdogPort for MockWatchdog {
    fn feed(&mut self) {
        self.feeds.fetch_add(1, Ordering::Relaxed);
    }
}

// ── MockI2c ───────────────────────────────────────────────────

/// Sensirion-style bus: a 2-byte command write selects the response words
/// served by the following read. Unknown addresses NACK.
#[derive(Default)]
pub struct BusState {
    pub devices: HashSet<u8>,
    pub responses: HashMap<(u8, u16), Vec<u16>>,
    pub commands: Vec<(u8, u16)>,
    last: Option<(u8, u16)>,
}

#[derive(Clone, Default)]
pub struct MockI2c {
    state: Arc<Mutex<BusState>>,
}

impl MockI2c {
    pub fn attach(&self, address: u8) {
        lock(&self.state).devices.insert(address);
    }

    pub fn detach(&self, address: u8) {
        lock(&self.state).devices.remove(&address);
    }

    pub fn respond(&self, address: u8, cmd: u16, words: &[u16]) {
        lock(&self.state)
            .responses
            .insert((address, cmd), words.to_vec());
    }

    pub fn commands(&self) -> Vec<(u8, u16)> {
        lock(&self.state).commands.clone()
    }

    pub fn sent(&self, address: u8, cmd: u16) -> bool {
        lock(&self.state).commands.contains(&(address, cmd))
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut s = lock(&self.state);
        if !s.devices.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if bytes.len() >= 2 {
                        let cmd = u16::from_be_bytes([bytes[0], bytes[1]]);
                        s.commands.push((address, cmd));
                        s.last = Some((address, cmd));
                    }
                }
                Operation::Read(buf) => {
                    let key = s.last.ok_or(ErrorKind::Other)?;
                    let words = s.responses.get(&key).ok_or(ErrorKind::Other)?;
                    let mut padded = words.clone();
                    padded.resize(buf.len().div_ceil(3), 0);
                    let mut raw = vec![0u8; padded.len() * 3];
                    let n = encode_words(&padded, &mut raw);
                    buf.copy_from_slice(&raw[..n.min(buf.len())]);
                }
            }
        }
        Ok(())
    }
}

// ── NoDelay ───────────────────────────────────────────────────

#[derive(Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Rig ───────────────────────────────────────────────────────

pub const MAC: [u8; 6] = [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE];

pub type MockSubsystem = SensorSubsystem<
    MockPeripheral<ParticulateReading>,
    MockPeripheral<Co2Reading>,
    MockRadio,
    MockUplink,
    MockWatchdog,
>;

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

pub fn particulate_sample() -> ParticulateReading {
    ParticulateReading {
        pm1p0: 52,
        pm2p5: 87,
        pm4p0: 101,
        pm10p0: 113,
        humidity: 4_512,
        temperature: 4_300,
        voc_index: 1_000,
        nox_index: 10,
    }
}

pub fn co2_sample() -> Co2Reading {
    Co2Reading {
        co2: 612,
        temperature: 21_500,
        humidity: 40_250,
    }
}

/// Subsystem plus handles onto every mock it owns.
pub struct Rig {
    pub sub: MockSubsystem,
    pub pm: MockPeripheral<ParticulateReading>,
    pub co2: MockPeripheral<Co2Reading>,
    pub radio: MockRadio,
    pub uplink: MockUplink,
    pub watchdog: MockWatchdog,
}

impl Rig {
    pub fn start(
        pm: MockPeripheral<ParticulateReading>,
        co2: MockPeripheral<Co2Reading>,
    ) -> Option<Self> {
        Self::start_with(&GatewayConfig::default(), pm, co2, MockRadio::ready())
    }

    pub fn start_with(
        config: &GatewayConfig,
        pm: MockPeripheral<ParticulateReading>,
        co2: MockPeripheral<Co2Reading>,
        radio: MockRadio,
    ) -> Option<Self> {
        let uplink = MockUplink::default();
        let watchdog = MockWatchdog::default();
        let sub = SensorSubsystem::start(
            config,
            DeviceIdentity::new(MAC),
            pm.clone(),
            co2.clone(),
            Ports {
                radio: radio.clone(),
                uplink: uplink.clone(),
                watchdog: watchdog.clone(),
            },
            Duration::ZERO,
        )
        .unwrap()?;
        Some(Self {
            sub,
            pm,
            co2,
            radio,
            uplink,
            watchdog,
        })
    }

    /// Run one scheduler pass at `t` milliseconds.
    pub fn tick(&mut self, t: u64) {
        self.sub.run_once(ms(t));
    }

    /// Run a pass every `step` ms over `(from, to]`.
    pub fn run(&mut self, from: u64, to: u64, step: u64) {
        let mut t = from + step;
        while t <= to {
            self.tick(t);
            t += step;
        }
    }
}
