//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

use crate::hid::keycodes;

// BLE

/// Complete local name put in the scan response and the GAP device name.
pub const DEVICE_NAME: &str = "blekbd";

/// GAP appearance: HID keyboard (0x03C1).
pub const DEVICE_APPEARANCE: u16 = 0x03C1;

/// Maximum number of simultaneously connected centrals (connection table size).
pub const MAX_CLIENTS: usize = 2;

/// Require passkey (MITM) pairing. When disabled the peer pairs with "Just Works".
pub const PASSKEY_AUTH: bool = false;

/// Maximum number of bonds kept in RAM before the oldest is evicted.
pub const MAX_BONDS: usize = 4;

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms (lowest latency for HID).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 30;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Fast advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

// HID

/// Number of simultaneous non-modifier keys in one keyboard report.
pub const KEY_SLOTS: usize = 6;

/// Key emitted (press + release) after a wake caused by the wake button,
/// so the host sees the keyboard come back.
pub const WAKE_TAP_KEY: u8 = keycodes::KEY_SPACE;

// GPIO pin assignments (nRF52840-DK defaults)
//
//   Text button  (key H, wake)   → P0.11
//   Shift button (Left Shift)    → P0.12
//   Status LED                   → P0.13
//   I²C SDA (LSM6DSO)            → P0.26
//   I²C SCL (LSM6DSO)            → P0.27

/// GPIO P0 pin that wakes the device from system-off.
pub const WAKE_PIN: u8 = 11;

/// Buttons are active-low with internal pull-ups.
pub const BUTTON_ACTIVE_LOW: bool = true;

/// HID key sent by the text button.
pub const TEXT_BUTTON_KEY: u8 = keycodes::KEY_H;

/// HID key sent by the shift button.
pub const SHIFT_BUTTON_KEY: u8 = keycodes::KEY_LEFT_SHIFT;

// Input pipeline

/// Quiet period after the last raw edge before the button level is sampled (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 10;

/// Capacity of the debounced edge queue between the buttons and the input task.
pub const INPUT_QUEUE_DEPTH: usize = 16;

/// Poll period of the input task while waiting for the first connection (ms).
pub const CONNECT_POLL_MS: u64 = 100;

// Power management

/// Inactivity timeout before the device disconnects and enters system-off (seconds).
pub const IDLE_TIMEOUT_SECS: u64 = 30;

/// Wait after issuing disconnect requests before the slots are released (ms).
pub const DISCONNECT_GRACE_MS: u32 = 100;

/// Settle time after advertising is stopped during teardown (ms).
pub const ADVERTISING_SETTLE_MS: u32 = 20;

/// Wait between the BLE teardown and system-off (ms).
pub const SLEEP_GRACE_MS: u32 = 3000;

/// Main-loop period: status LED blink and simulated battery drain (ms).
pub const MAIN_TICK_MS: u64 = 1000;

// Motion sensor

/// 7-bit I²C address of the LSM6DSO (SA0 low).
pub const IMU_I2C_ADDR: u8 = 0x6A;

/// Raw sample logging period while awake (ms).
pub const IMU_SAMPLE_MS: u64 = 1000;
