//! Device identity derived from the ESP32 factory Bluetooth MAC address.
//!
//! The 6-byte address is read once at startup and never changes. It is:
//! - Embedded in every sensor payload
//! - Used for the advertised local name (`AirQ XXYY`, last two MAC bytes)

use core::fmt::{self, Write};

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Advertised device name: "AirQ XXYY" (9 chars).
pub type DeviceName = heapless::String<16>;

/// Model prefix of the advertised name.
pub const MODEL_NAME: &str = "AirQ";

/// Immutable device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(MacAddress);

impl DeviceIdentity {
    pub const fn new(mac: MacAddress) -> Self {
        Self(mac)
    }

    pub const fn mac(&self) -> &MacAddress {
        &self.0
    }

    /// `AirQ XXYY` from the last two MAC bytes.
    pub fn device_name(&self) -> DeviceName {
        let mut name = DeviceName::new();
        let _ = write!(name, "{} {:02X}{:02X}", MODEL_NAME, self.0[4], self.0[5]);
        name
    }

    /// Read the factory Bluetooth MAC from eFuse.
    #[cfg(target_os = "espidf")]
    pub fn read() -> crate::error::Result<Self> {
        let mut mac: MacAddress = [0u8; 6];
        let rc = unsafe {
            esp_idf_svc::sys::esp_read_mac(
                mac.as_mut_ptr(),
                esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_BT,
            )
        };
        if rc != esp_idf_svc::sys::ESP_OK {
            return Err(crate::error::Error::Init("esp_read_mac failed"));
        }
        Ok(Self(mac))
    }

    /// Simulation: a deterministic fake MAC.
    #[cfg(not(target_os = "espidf"))]
    pub fn read() -> crate::error::Result<Self> {
        Ok(Self([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}
