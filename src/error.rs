//! Unified error type for blekbd.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // HID
    /// Every non-modifier key slot of the keyboard report is occupied.
    SlotsExhausted,

    // BLE
    /// An event referenced a connection handle the table does not hold.
    ConnectionNotFound,

    /// A connection arrived while every connection slot was taken.
    NoFreeSlot,

    /// The input report could not be queued for one connection.
    SendFailed,

    /// The stack refused to terminate a link it holds.
    DisconnectFailed,

    /// An advertising payload does not fit one PDU.
    PayloadTooLong,

    /// Advertising was requested while it was already running.
    ///
    /// Callers treat this as success.
    AlreadyInProgress,

    // Drivers
    /// The peripheral did not answer or identified itself unexpectedly.
    DeviceNotReady,

    /// A register read or write on the peripheral bus failed.
    RegisterIo,
}
