//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! `embassy-sync` locks through `critical-section` 1.x. On ESP-IDF the
//! implementation below backs it with a process-wide std mutex, re-entrant
//! per thread via a depth counter.
//!
//! `async-io-mini` timers run on the `embassy-time` driver interface. On
//! ESP-IDF the driver is the high-resolution timer plus one sleeper thread per
//! scheduled wake. Host builds link embassy-time's `std` driver, which also
//! pulls in the `std` critical-section impl.

#[cfg(not(target_os = "espidf"))]
use embassy_time as _;

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static DEPTH: Cell<u8> = const { Cell::new(0) };
    static GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // A panic inside a critical section leaves nothing half-written
            // that the lock protects, so poisoning is ignored.
            let lock = CRITICAL_SECTION_MUTEX
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    })
}

/// Tick source for `embassy-time`, in microseconds since boot.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

/// Wake scheduler for `embassy-time` timers.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(at: u64, waker: *mut core::ffi::c_void) {
    if waker.is_null() {
        return;
    }

    // SAFETY: embassy-time passes a pointer to a `Waker` that is valid for
    // the duration of this call. It is cloned before returning.
    let waker = unsafe { (&*(waker as *const core::task::Waker)).clone() };
    let sleeper = waker.clone();
    let spawned = std::thread::Builder::new()
        .stack_size(3072)
        .spawn(move || {
            let now = _embassy_time_now();
            if at > now {
                std::thread::sleep(Duration::from_micros(at - now));
            }
            sleeper.wake();
        });
    if spawned.is_err() {
        // Early wake; the timer re-registers on its next poll.
        waker.wake();
    }
}
