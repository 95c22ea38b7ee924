//! SEN5x / SCD4x drivers against a scripted I2C bus, and the full
//! subsystem running on both drivers sharing one bus.

use core::cell::RefCell;
use core::time::Duration;

use airq_gateway::adapters::device_id::DeviceIdentity;
use airq_gateway::app::payload::{Channel, decode_payload};
use airq_gateway::app::ports::Peripheral;
use airq_gateway::app::subsystem::{Ports, SensorSubsystem};
use airq_gateway::config::GatewayConfig;
use airq_gateway::error::SensorError;
use airq_gateway::sensors::scd4x::{self, Scd4x};
use airq_gateway::sensors::sen5x::{self, Sen5x, Sen5xVariant};
use embedded_hal_bus::i2c::RefCellDevice;

use crate::mock_hw::{MAC, MockI2c, MockRadio, MockUplink, MockWatchdog, NoDelay, particulate_sample};

const SEN55_NAME: [u16; 3] = [0x5345, 0x4E35, 0x3500]; // "SEN55"

fn sen5x_bus() -> MockI2c {
    let bus = MockI2c::default();
    bus.attach(sen5x::I2C_ADDRESS);
    bus.respond(sen5x::I2C_ADDRESS, 0xD014, &SEN55_NAME);
    bus.respond(sen5x::I2C_ADDRESS, 0x0202, &[0x0001]);
    let s = particulate_sample();
    bus.respond(
        sen5x::I2C_ADDRESS,
        0x03C4,
        &[
            s.pm1p0,
            s.pm2p5,
            s.pm4p0,
            s.pm10p0,
            s.humidity as u16,
            s.temperature as u16,
            s.voc_index as u16,
            s.nox_index as u16,
        ],
    );
    bus
}

fn scd4x_bus() -> MockI2c {
    let bus = MockI2c::default();
    bus.attach(scd4x::I2C_ADDRESS);
    bus.respond(scd4x::I2C_ADDRESS, 0x3682, &[0xF896, 0x9F07, 0x3BB9]);
    bus.respond(scd4x::I2C_ADDRESS, 0xE4B8, &[0x8006]);
    bus.respond(scd4x::I2C_ADDRESS, 0xEC05, &[612, 0x6667, 0x5EB9]);
    bus
}

// ── SEN5x ─────────────────────────────────────────────────────

#[test]
fn sen5x_probe_identifies_variant() {
    let bus = sen5x_bus();
    let mut sen = Sen5x::new(bus.clone(), NoDelay);
    assert!(sen.probe());
    assert_eq!(sen.variant(), Some(Sen5xVariant::Sen55));
    assert!(bus.sent(sen5x::I2C_ADDRESS, 0xD304), "probe resets the part");
}

#[test]
fn sen5x_rejects_unknown_product() {
    let bus = sen5x_bus();
    bus.respond(sen5x::I2C_ADDRESS, 0xD014, &[0x5346, 0x5F30, 0x0000]); // "SF_0"
    let mut sen = Sen5x::new(bus, NoDelay);
    assert!(!sen.probe());
}

#[test]
fn sen5x_reads_all_channels() {
    let mut sen = Sen5x::new(sen5x_bus(), NoDelay);
    assert!(sen.probe());
    sen.start_sampling().unwrap();
    assert_eq!(sen.read_sample().unwrap(), particulate_sample());
}

#[test]
fn sen5x_not_ready_when_flag_clear() {
    let bus = sen5x_bus();
    bus.respond(sen5x::I2C_ADDRESS, 0x0202, &[0x0000]);
    let mut sen = Sen5x::new(bus, NoDelay);
    assert_eq!(sen.read_sample(), Err(SensorError::NotReady));
}

#[test]
fn sen5x_absent_part_fails_probe() {
    let bus = MockI2c::default();
    let mut sen = Sen5x::new(bus, NoDelay);
    assert!(!sen.probe());
}

// ── SCD4x ─────────────────────────────────────────────────────

#[test]
fn scd4x_probe_reads_serial() {
    let bus = scd4x_bus();
    let mut scd = Scd4x::new(bus.clone(), NoDelay);
    assert!(scd.probe());
    assert_eq!(scd.serial(), Some(0xF896_9F07_3BB9));
    assert!(bus.sent(scd4x::I2C_ADDRESS, 0x3F86), "stops periodic mode");
    assert!(bus.sent(scd4x::I2C_ADDRESS, 0x3646), "reinitialises");
}

#[test]
fn scd4x_converts_to_milli_units() {
    let mut scd = Scd4x::new(scd4x_bus(), NoDelay);
    let reading = scd.read_sample().unwrap();
    assert_eq!(reading.co2, 612);
    assert_eq!(reading.temperature / 1000, 25);
    assert_eq!(reading.humidity / 1000, 37);
}

#[test]
fn scd4x_bus_error_surfaces() {
    let bus = scd4x_bus();
    bus.detach(scd4x::I2C_ADDRESS);
    let mut scd = Scd4x::new(bus, NoDelay);
    assert_eq!(scd.read_sample(), Err(SensorError::Bus));
    assert!(scd.reinit().is_err());
}

// ── Shared bus, end to end ────────────────────────────────────

#[test]
fn subsystem_on_shared_bus_publishes_both_sensors() {
    let mock = sen5x_bus();
    mock.attach(scd4x::I2C_ADDRESS);
    mock.respond(scd4x::I2C_ADDRESS, 0x3682, &[0xF896, 0x9F07, 0x3BB9]);
    mock.respond(scd4x::I2C_ADDRESS, 0xE4B8, &[0x8006]);
    mock.respond(scd4x::I2C_ADDRESS, 0xEC05, &[612, 0x6667, 0x5EB9]);

    let bus = RefCell::new(mock);
    let uplink = MockUplink::default();
    let mut sub = SensorSubsystem::start(
        &GatewayConfig::default(),
        DeviceIdentity::new(MAC),
        Sen5x::new(RefCellDevice::new(&bus), NoDelay),
        Scd4x::new(RefCellDevice::new(&bus), NoDelay),
        Ports {
            radio: MockRadio::ready(),
            uplink: uplink.clone(),
            watchdog: MockWatchdog::default(),
        },
        Duration::ZERO,
    )
    .unwrap()
    .unwrap();

    sub.run_once(Duration::from_millis(5_000));

    let sent = uplink.sent();
    assert_eq!(sent.len(), 2, "both pollers due, one publish each");
    let last = decode_payload(sent.last().unwrap()).unwrap();
    assert_eq!(last.get(Channel::Pm2p5), Some(8.7));
    assert_eq!(last.get(Channel::Co2), Some(612.0));
    assert_eq!(last.get(Channel::Co2Temperature).map(f32::round), Some(25.0));
}
