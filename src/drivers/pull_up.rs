//! External pull-up detection on the I2C clock line.
//!
//! The pin is read twice as a plain input: once floating, once with the
//! internal pull-up enabled. Low then high means nothing on the board holds
//! the line up, so no I2C peripheral can be fitted and polling is skipped.
//! The pin is left disabled afterwards for the I2C driver to claim.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

/// Decide from the two samples (internal pull-up off, then on).
pub fn external_pull_up_present(floating_high: bool, pulled_high: bool) -> bool {
    floating_high || !pulled_high
}

#[cfg(target_os = "espidf")]
fn configure(pin: i32, mode: gpio_mode_t, pull_up: gpio_pullup_t) -> i32 {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: pull_up,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    unsafe { gpio_config(&cfg) }
}

/// Sample `pin` and report whether an external pull-up is fitted.
///
/// A pin that cannot be configured is reported as pulled up; the peripheral
/// probes then decide.
#[cfg(target_os = "espidf")]
pub fn detect(pin: i32) -> bool {
    let ret = configure(pin, gpio_mode_t_GPIO_MODE_INPUT, gpio_pullup_t_GPIO_PULLUP_DISABLE);
    if ret != ESP_OK as i32 {
        warn!("pull-up check: gpio{} config failed (rc={})", pin, ret);
        return true;
    }
    // SAFETY: register read on a pin just configured as input.
    let floating_high = unsafe { gpio_get_level(pin) } != 0;

    configure(pin, gpio_mode_t_GPIO_MODE_INPUT, gpio_pullup_t_GPIO_PULLUP_ENABLE);
    let pulled_high = unsafe { gpio_get_level(pin) } != 0;

    configure(pin, gpio_mode_t_GPIO_MODE_DISABLE, gpio_pullup_t_GPIO_PULLUP_DISABLE);
    external_pull_up_present(floating_high, pulled_high)
}

/// Simulation: the bus is always fitted.
#[cfg(not(target_os = "espidf"))]
pub fn detect(_pin: i32) -> bool {
    true
}
