//! Core-pinned thread spawning.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` sets the affinity, priority and stack of the
//! *next* `pthread_create()` from the calling thread, so configure and
//! spawn must not be interleaved with other thread creation on that thread.
//! On other targets only the name and stack size are honoured.

use std::io;
use std::thread::JoinHandle;

/// CPU core a task is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    /// Core 0 (PRO_CPU), shared with the BT controller.
    Pro,
    /// Core 1 (APP_CPU).
    App,
    /// Let the scheduler pick.
    Any,
}

/// Parameters for one spawned task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// Must be NUL-terminated, e.g. `"sensor-worker\0"`.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

#[cfg(target_os = "espidf")]
pub fn spawn<F, T>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    use esp_idf_svc::sys::*;
    unsafe {
        let mut cfg = esp_create_default_pthread_config();
        cfg.pin_to_core = match spec.core {
            Core::Pro => 0,
            Core::App => 1,
            Core::Any => tskNO_AFFINITY as i32,
        };
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        let ret = esp_pthread_set_cfg(&cfg);
        if ret != ESP_OK {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

#[cfg(not(target_os = "espidf"))]
pub fn spawn<F, T>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
