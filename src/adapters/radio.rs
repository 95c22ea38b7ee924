//! BLE advertising radio adapter.
//!
//! Implements [`RadioPort`]: the single advertising slot the arbiter
//! time-shares between sensor data and name bursts.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid extended advertising
//!   (non-connectable, non-scannable, instance 0). The ready gate opens from
//!   the GAP callback once the stack accepted the first parameter set.
//! - **all other targets**: simulation that records what is on air.
//!
//! ## Advertising data
//!
//! | Frame  | AD structures                                         |
//! |--------|-------------------------------------------------------|
//! | Data   | Flags (LE General Discoverable, BR/EDR not supported) |
//! |        | Manufacturer Specific Data = payload                  |
//! | Name   | Flags, Complete Local Name                            |

use heapless::Vec;
use log::{debug, info};

use crate::app::advertising::ReadyGate;
use crate::app::ports::{AdvFrame, RadioPort};
use crate::error::RadioError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Largest advertising data carried in one extended advertising PDU.
pub const MAX_ADV_DATA: usize = 251;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;
const AD_FLAGS_LE_GENERAL_NO_BREDR: u8 = 0x06;

/// Ready gate opened by the stack callback.
pub static RADIO_READY: ReadyGate = ReadyGate::new();

pub type AdvData = Vec<u8, MAX_ADV_DATA>;

// ───────────────────────────────────────────────────────────────
// AD encoding
// ───────────────────────────────────────────────────────────────

fn push_ad(out: &mut AdvData, ad_type: u8, body: &[u8]) -> Result<(), RadioError> {
    let len = u8::try_from(body.len() + 1).map_err(|_| RadioError::PayloadTooLong)?;
    out.push(len).map_err(|_| RadioError::PayloadTooLong)?;
    out.push(ad_type).map_err(|_| RadioError::PayloadTooLong)?;
    out.extend_from_slice(body)
        .map_err(|_| RadioError::PayloadTooLong)
}

/// Build the raw advertising data for `frame`.
pub fn build_adv_data(frame: AdvFrame<'_>) -> Result<AdvData, RadioError> {
    let mut out = AdvData::new();
    push_ad(&mut out, AD_TYPE_FLAGS, &[AD_FLAGS_LE_GENERAL_NO_BREDR])?;
    match frame {
        AdvFrame::Data(payload) => push_ad(&mut out, AD_TYPE_MANUFACTURER_DATA, payload)?,
        AdvFrame::Name(name) => push_ad(&mut out, AD_TYPE_COMPLETE_LOCAL_NAME, name.as_bytes())?,
    }
    Ok(out)
}

/// Interval in 0.625 ms units → microseconds, for logs.
pub fn interval_us(units: u16) -> u32 {
    u32::from(units) * 625
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF GAP callback
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const ADV_INSTANCE: u8 = 0;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_EXT_ADV_SET_PARAMS_COMPLETE_EVT => {
            let status = unsafe { (*param).ext_adv_set_params.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                if RADIO_READY.open() {
                    log::info!("BLE GAP: advertising ready");
                }
            } else {
                log::warn!("BLE GAP: set ext adv params failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_EXT_ADV_START_COMPLETE_EVT => {
            let status = unsafe { (*param).ext_adv_start.status };
            if status != esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::warn!("BLE GAP: ext adv start failed (status={})", status);
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Radio adapter
// ───────────────────────────────────────────────────────────────

/// What the simulated radio is broadcasting.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnAir {
    pub data: AdvData,
    pub interval: u16,
}

pub struct BleRadio {
    gate: &'static ReadyGate,
    advertising: bool,
    /// Intervals the current parameter set was configured with.
    #[cfg(target_os = "espidf")]
    configured_interval: Option<u16>,
    #[cfg(not(target_os = "espidf"))]
    on_air: Option<OnAir>,
    #[cfg(not(target_os = "espidf"))]
    starts: u32,
    #[cfg(not(target_os = "espidf"))]
    fail_next_start: bool,
}

impl BleRadio {
    /// Radio bound to the global ready gate.
    pub fn new() -> Self {
        Self::with_gate(&RADIO_READY)
    }

    pub fn with_gate(gate: &'static ReadyGate) -> Self {
        Self {
            gate,
            advertising: false,
            #[cfg(target_os = "espidf")]
            configured_interval: None,
            #[cfg(not(target_os = "espidf"))]
            on_air: None,
            #[cfg(not(target_os = "espidf"))]
            starts: 0,
            #[cfg(not(target_os = "espidf"))]
            fail_next_start: false,
        }
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Bring up the controller and Bluedroid and submit the initial
    /// parameter set. Readiness is reported asynchronously via the gate.
    #[cfg(target_os = "espidf")]
    pub fn init(&mut self, data_interval: u16) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // BLE only: release classic BT memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK {
                return Err(RadioError::ConfigureFailed(ret));
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK {
                return Err(RadioError::ConfigureFailed(ret));
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK {
                return Err(RadioError::ConfigureFailed(ret));
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK {
                return Err(RadioError::ConfigureFailed(ret));
            }
            let ret = esp_ble_gap_register_callback(Some(gap_event_handler));
            if ret != ESP_OK {
                return Err(RadioError::ConfigureFailed(ret));
            }
        }
        self.set_params(data_interval)?;
        info!("BLE(espidf): Bluedroid up, waiting for stack ready");
        Ok(())
    }

    /// Simulation: the stack is ready as soon as it is initialised.
    #[cfg(not(target_os = "espidf"))]
    pub fn init(&mut self, _data_interval: u16) -> Result<(), RadioError> {
        if self.gate.open() {
            info!("BLE(sim): stack ready");
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn set_params(&mut self, interval: u16) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        if self.configured_interval == Some(interval) {
            return Ok(());
        }
        let ret = unsafe {
            let params = esp_ble_gap_ext_adv_params_t {
                type_: ESP_BLE_GAP_SET_EXT_ADV_PROP_NONCONN_NONSCANNABLE_UNDIRECTED as u16,
                interval_min: u32::from(interval),
                interval_max: u32::from(interval),
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                tx_power: EXT_ADV_TX_PWR_NO_PREFERENCE as i8,
                primary_phy: ESP_BLE_GAP_PHY_1M as u8,
                secondary_phy: ESP_BLE_GAP_PHY_1M as u8,
                ..core::mem::zeroed()
            };
            esp_ble_gap_ext_adv_set_params(ADV_INSTANCE, &params)
        };
        if ret != ESP_OK {
            return Err(RadioError::ConfigureFailed(ret));
        }
        self.configured_interval = Some(interval);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, data: &AdvData, interval: u16) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        self.set_params(interval)?;
        let ret = unsafe {
            esp_ble_gap_config_ext_adv_data_raw(ADV_INSTANCE, data.len() as u16, data.as_ptr())
        };
        if ret != ESP_OK {
            return Err(RadioError::ConfigureFailed(ret));
        }
        let ext_adv = [esp_ble_gap_ext_adv_t {
            instance: ADV_INSTANCE,
            duration: 0,
            max_events: 0,
        }];
        let ret = unsafe { esp_ble_gap_ext_adv_start(1, ext_adv.as_ptr()) };
        if ret != ESP_OK {
            return Err(RadioError::StartFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, data: &AdvData, interval: u16) -> Result<(), RadioError> {
        if core::mem::take(&mut self.fail_next_start) {
            return Err(RadioError::StartFailed(-1));
        }
        self.on_air = Some(OnAir {
            data: data.clone(),
            interval,
        });
        self.starts += 1;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        let instances = [ADV_INSTANCE];
        let ret = unsafe { esp_ble_gap_ext_adv_stop(1, instances.as_ptr()) };
        if ret != ESP_OK {
            return Err(RadioError::StopFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) -> Result<(), RadioError> {
        self.on_air = None;
        Ok(())
    }

    /// Simulation: what is currently on air.
    #[cfg(not(target_os = "espidf"))]
    pub fn on_air(&self) -> Option<&OnAir> {
        self.on_air.as_ref()
    }

    /// Simulation: number of successful starts.
    #[cfg(not(target_os = "espidf"))]
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Simulation: make the next start fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn fail_next_start(&mut self) {
        self.fail_next_start = true;
    }
}

impl Default for BleRadio {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

impl RadioPort for BleRadio {
    fn start_advertising(&mut self, frame: AdvFrame<'_>, interval: u16) -> Result<(), RadioError> {
        let data = build_adv_data(frame)?;
        // Parameters can only change while stopped.
        if self.advertising {
            self.platform_stop()?;
            self.advertising = false;
        }
        self.platform_start(&data, interval)?;
        self.advertising = true;
        debug!(
            "BLE: advertising {} bytes every {} us",
            data.len(),
            interval_us(interval)
        );
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), RadioError> {
        if !self.advertising {
            return Ok(());
        }
        self.platform_stop()?;
        self.advertising = false;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.gate.is_open()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
