//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements   | Connects to                        |
//! |-------------|--------------|------------------------------------|
//! | `device_id` | -            | Factory BT MAC (eFuse)             |
//! | `radio`     | RadioPort    | Bluedroid extended advertising     |
//! | `time`      | Clock        | ESP32 high-resolution timer        |
//! | `uplink`    | UplinkPort   | Bounded channel to uplink task     |

pub mod device_id;
pub mod radio;
pub mod time;
pub mod uplink;
