//! Sensor worker: the single cooperative consumer of the event bus.
//!
//! Runs in a dedicated thread using `edge-executor` with one task:
//!
//! ```text
//!  ┌──────────────────── sensor-worker thread ─────────────────────┐
//!  │  futures_lite::block_on(LocalExecutor::run(pending))          │
//!  │   └─ run(): loop {                                            │
//!  │        fire_timers(now)           timers → EventBus           │
//!  │        bus.wait(next_deadline)    only suspension point       │
//!  │        dispatch(set, now)         lowest EventKind first      │
//!  │      }                                                        │
//!  └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The subsystem is built *on* the worker thread so peripherals sharing a
//! `RefCell` bus never cross threads.

use core::time::Duration;
use std::io;
use std::thread::JoinHandle;

use log::{error, info};

use crate::app::ports::{Clock, Peripheral, RadioPort, UplinkPort, WatchdogPort};
use crate::app::subsystem::SensorSubsystem;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::Result;

/// Thread parameters for the sensor worker.
pub const WORKER_TASK: TaskSpec = TaskSpec {
    name: "sensor-worker\0",
    core: Core::App,
    priority: 5,
    stack_kb: 8,
};

/// Drive `subsystem` forever.
pub async fn run<Pm, Co, R, U, W, C>(mut subsystem: SensorSubsystem<Pm, Co, R, U, W>, clock: C)
where
    Pm: Peripheral,
    Co: Peripheral,
    R: RadioPort,
    U: UplinkPort,
    W: WatchdogPort,
    C: Clock,
{
    let bus = subsystem.bus();
    loop {
        let now = clock.now();
        subsystem.fire_timers(now);
        let timeout = subsystem.next_timeout(now);
        let set = bus.wait(timeout).await;
        subsystem.dispatch(set, clock.now());
    }
}

fn run_worker<Pm, Co, R, U, W, C, F>(build: F, clock: C) -> Result<bool>
where
    Pm: Peripheral,
    Co: Peripheral,
    R: RadioPort,
    U: UplinkPort,
    W: WatchdogPort,
    C: Clock,
    F: FnOnce(Duration) -> Result<Option<SensorSubsystem<Pm, Co, R, U, W>>>,
{
    let Some(subsystem) = build(clock.now())? else {
        return Ok(false);
    };

    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor.spawn(run(subsystem, clock)).detach();
    info!("Worker: running");

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(true)
}

/// Spawn the sensor worker thread.
///
/// `build` receives the clock's current time and constructs the subsystem on
/// the new thread. The join handle yields `Ok(false)` when the subsystem
/// did not start; a started worker never returns.
pub fn spawn<Pm, Co, R, U, W, C, F>(
    spec: TaskSpec,
    build: F,
    clock: C,
) -> io::Result<JoinHandle<Result<bool>>>
where
    Pm: Peripheral + 'static,
    Co: Peripheral + 'static,
    R: RadioPort + 'static,
    U: UplinkPort + 'static,
    W: WatchdogPort + 'static,
    C: Clock + Send + 'static,
    F: FnOnce(Duration) -> Result<Option<SensorSubsystem<Pm, Co, R, U, W>>> + Send + 'static,
{
    task_pin::spawn(spec, move || {
        let result = run_worker(build, clock);
        match &result {
            Ok(false) => info!("Worker: subsystem did not start, exiting"),
            Err(e) => error!("Worker: start failed: {}", e),
            Ok(true) => {}
        }
        result
    })
}
