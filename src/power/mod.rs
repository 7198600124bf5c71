//! Power management module - idle timeout and system-off for battery operation.
//!
//! nRF52840 power modes used here:
//! - System ON: normal operation, BLE active
//! - System OFF: deep sleep, wake on the button's GPIO SENSE (~0.4 µA)

pub mod idle;
pub mod runtime;
pub mod sleep;
