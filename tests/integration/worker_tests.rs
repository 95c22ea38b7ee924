//! Worker thread on the real clock.

use std::time::{Duration, Instant};

use airq_gateway::adapters::device_id::DeviceIdentity;
use airq_gateway::adapters::time::SystemClock;
use airq_gateway::app::payload::decode_payload;
use airq_gateway::app::subsystem::{Ports, SensorSubsystem};
use airq_gateway::config::GatewayConfig;
use airq_gateway::drivers::task_pin::{Core, TaskSpec};
use airq_gateway::error::SensorError;
use airq_gateway::sensors::{Co2Reading, ParticulateReading};
use airq_gateway::worker;

use crate::mock_hw::{
    MAC, MockPeripheral, MockRadio, MockUplink, MockWatchdog, particulate_sample,
};

const TEST_TASK: TaskSpec = TaskSpec {
    name: "sensor-worker-test\0",
    core: Core::Any,
    priority: 5,
    stack_kb: 256,
};

fn fast_config() -> GatewayConfig {
    GatewayConfig {
        particulate_poll_ms: 50,
        co2_poll_ms: 100,
        short_check_ms: 10,
        watchdog_timeout_ms: 150,
        ..GatewayConfig::default()
    }
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn worker_polls_publishes_and_feeds() {
    let pm = MockPeripheral::<ParticulateReading>::present(Ok(particulate_sample()));
    let co2 = MockPeripheral::<Co2Reading>::present(Err(SensorError::NotReady));
    let radio = MockRadio::ready();
    let uplink = MockUplink::default();
    let watchdog = MockWatchdog::default();

    let ports = Ports {
        radio: radio.clone(),
        uplink: uplink.clone(),
        watchdog: watchdog.clone(),
    };
    let _handle = worker::spawn(
        TEST_TASK,
        move |now| {
            SensorSubsystem::start(&fast_config(), DeviceIdentity::new(MAC), pm, co2, ports, now)
        },
        SystemClock::new(),
    )
    .unwrap();

    assert!(
        wait_for(Duration::from_secs(5), || uplink.sent().len() >= 3),
        "worker should publish repeatedly"
    );
    assert!(wait_for(Duration::from_secs(5), || watchdog.feeds() >= 2));

    let sequences: Vec<u16> = uplink
        .sent()
        .iter()
        .map(|p| decode_payload(p).unwrap().sequence)
        .collect();
    assert!(sequences.windows(2).all(|w| w[1] > w[0]));
    assert!(radio.on_air().is_some());
}

#[test]
fn worker_exits_when_nothing_is_present() {
    let handle = worker::spawn(
        TEST_TASK,
        |now| {
            SensorSubsystem::start(
                &GatewayConfig::default(),
                DeviceIdentity::new(MAC),
                MockPeripheral::<ParticulateReading>::absent(),
                MockPeripheral::<Co2Reading>::absent(),
                Ports {
                    radio: MockRadio::ready(),
                    uplink: MockUplink::default(),
                    watchdog: MockWatchdog::default(),
                },
                now,
            )
        },
        SystemClock::new(),
    )
    .unwrap();

    assert_eq!(handle.join().unwrap(), Ok(false));
}
