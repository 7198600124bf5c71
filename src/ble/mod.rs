//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Connection table** - which centrals are connected and in which HID
//!    protocol mode.
//! 2. **Lifecycle** - connect/disconnect/protocol-mode handling, advertising
//!    restarts and the safe teardown before system-off.
//! 3. **GATT server** - Battery and HID services.
//! 4. **Advertising payloads** - flags, appearance, name and service UUIDs.
//! 5. **Stack glue** - advertising, per-connection tasks and report
//!    notification on top of the SoftDevice.

pub mod adv;
pub mod conn_table;
pub mod gatt;
pub mod link;
pub mod security;
pub mod stack;
