//! AirQ Gateway: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │  Sen5x / Scd4x     BleRadio     UplinkSender   TaskWatchdog  │
//! │  (Peripheral)      (RadioPort)  (UplinkPort)   (Watchdog)    │
//! │  ─────────────────── Port Trait Boundary ──────────────────  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ SensorSubsystem: pollers · arbiter · watchdog feeder   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  EventBus + TimerService, driven by the sensor-worker thread │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::cell::RefCell;

use anyhow::Result;
use embedded_hal_bus::i2c::RefCellDevice;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use airq_gateway::adapters::device_id::DeviceIdentity;
use airq_gateway::adapters::radio::BleRadio;
use airq_gateway::adapters::time::SystemClock;
use airq_gateway::adapters::uplink::{UPLINK, UplinkSender};
use airq_gateway::app::payload::decode_payload;
use airq_gateway::app::subsystem::{Ports, SensorSubsystem};
use airq_gateway::config::GatewayConfig;
use airq_gateway::drivers::pull_up;
use airq_gateway::drivers::watchdog::TaskWatchdog;
use airq_gateway::sensors::scd4x::Scd4x;
use airq_gateway::sensors::sen5x::Sen5x;
use airq_gateway::worker::{self, WORKER_TASK};

const I2C_BAUDRATE: Hertz = Hertz(100_000);
const I2C_SCL_GPIO: i32 = 22;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("AirQ gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::default();
    config.validate()?;

    let identity = DeviceIdentity::read()?;
    info!("Device {} ({})", identity, identity.device_name());

    // ── 2. Radio ──────────────────────────────────────────────
    let mut radio = BleRadio::new();
    radio.init(config.data_adv_interval)?;

    // ── 3. I2C master shared by both Sensirion parts ──────────
    // Checked before the I2C driver claims the pin.
    if pull_up::detect(I2C_SCL_GPIO) {
        info!("I2C: external pull-up on SCL, starting sensor polling");
        start_sensor_worker(&config, identity, radio)?;
    } else {
        info!("I2C: no external pull-up on SCL, sensor polling disabled");
    }

    // ── 4. Uplink forwarder ───────────────────────────────────
    loop {
        let payload = futures_lite::future::block_on(UPLINK.receive());
        match decode_payload(&payload) {
            Ok(decoded) => info!("Uplink: seq={} from {}", decoded.sequence, decoded.identity),
            Err(e) => warn!("Uplink: undecodable payload: {}", e),
        }
    }
}

fn start_sensor_worker(config: &GatewayConfig, identity: DeviceIdentity, radio: BleRadio) -> Result<()> {
    let peripherals = Peripherals::take()?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(I2C_BAUDRATE),
    )?;
    let worker_config = config.clone();
    let watchdog = TaskWatchdog::new(config.watchdog_timeout_ms);
    let _worker = worker::spawn(
        WORKER_TASK,
        move |now| {
            // Lives for the rest of the program; both devices borrow it.
            let bus: &'static RefCell<I2cDriver<'static>> = Box::leak(Box::new(RefCell::new(i2c)));
            SensorSubsystem::start(
                &worker_config,
                identity,
                Sen5x::new(RefCellDevice::new(bus), FreeRtos),
                Scd4x::new(RefCellDevice::new(bus), FreeRtos),
                Ports {
                    radio,
                    uplink: UplinkSender::global(),
                    watchdog,
                },
                now,
            )
        },
        SystemClock::new(),
    )?;
    Ok(())
}
