//! HID keyboard input report state (boot protocol compatible).
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```
//!
//! The same bytes are sent in boot and report protocol mode; only the GATT
//! characteristic they are notified on differs.

use crate::config::KEY_SLOTS;
use crate::error::Error;
use crate::hid::keycodes::{self, KEY_NONE};

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 2 + KEY_SLOTS;

/// Currently pressed keys, in report form.
///
/// Invariant: no non-zero key code appears twice in `keycodes`, and
/// `modifier` only carries bits set by control-key presses.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Pressed key codes; 0 marks a free slot.
    pub keycodes: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [KEY_NONE; KEY_SLOTS],
        }
    }

    /// Mark `key` as held.
    ///
    /// Control keys set their modifier bit. Other keys take the first free
    /// slot. Pressing a key that is already held, or the null code, leaves
    /// the report unchanged.
    pub fn press(&mut self, key: u8) -> Result<(), Error> {
        if let Some(bit) = keycodes::modifier_bit(key) {
            self.modifier |= bit;
            return Ok(());
        }
        if key == KEY_NONE || self.keycodes.contains(&key) {
            return Ok(());
        }
        let slot = self
            .keycodes
            .iter_mut()
            .find(|k| **k == KEY_NONE)
            .ok_or(Error::SlotsExhausted)?;
        *slot = key;
        Ok(())
    }

    /// Mark `key` as released. Releasing a key that is not held is a no-op.
    pub fn release(&mut self, key: u8) {
        if let Some(bit) = keycodes::modifier_bit(key) {
            self.modifier &= !bit;
            return;
        }
        if key == KEY_NONE {
            return;
        }
        if let Some(slot) = self.keycodes.iter_mut().find(|k| **k == key) {
            *slot = KEY_NONE;
        }
    }

    /// Serialise into a byte slice for GATT notification.
    /// Returns the number of bytes written (0 if `buf` is too small).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..KEYBOARD_REPORT_SIZE].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    /// The report as a fixed-size byte array.
    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        self.serialize(&mut buf);
        buf
    }

    /// Number of occupied non-modifier slots.
    pub fn held_keys(&self) -> usize {
        self.keycodes.iter().filter(|&&k| k != KEY_NONE).count()
    }

    /// Returns `true` if no keys are pressed (release event).
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == KEY_NONE)
    }
}

/// Lock-LED state written by the host in the keyboard output report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedReport(pub u8);

impl LedReport {
    pub const NUM_LOCK: u8 = 1 << 0;
    pub const CAPS_LOCK: u8 = 1 << 1;
    pub const SCROLL_LOCK: u8 = 1 << 2;
    pub const COMPOSE: u8 = 1 << 3;
    pub const KANA: u8 = 1 << 4;
    const ALL: u8 =
        Self::NUM_LOCK | Self::CAPS_LOCK | Self::SCROLL_LOCK | Self::COMPOSE | Self::KANA;

    /// Decode an output report payload. Empty payloads read as all-off.
    pub fn from_output_bytes(data: &[u8]) -> Self {
        Self(data.first().copied().unwrap_or(0) & Self::ALL)
    }

    pub fn num_lock(&self) -> bool {
        self.0 & Self::NUM_LOCK != 0
    }

    pub fn caps_lock(&self) -> bool {
        self.0 & Self::CAPS_LOCK != 0
    }

    pub fn scroll_lock(&self) -> bool {
        self.0 & Self::SCROLL_LOCK != 0
    }

    pub fn compose(&self) -> bool {
        self.0 & Self::COMPOSE != 0
    }

    pub fn kana(&self) -> bool {
        self.0 & Self::KANA != 0
    }
}

// HID report descriptor for a boot-protocol keyboard

/// HID Report Descriptor served in the Report Map characteristic.
///
/// This descriptor tells the host that we are a keyboard with:
///   - 8 modifier key bits (input)
///   - 1 reserved byte
///   - 6 key code bytes (input)
///   - 5 LED indicators (output)
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    //
    //   - Modifier keys (8 bits) -
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Reserved byte -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) - padding
    //
    //   - Key codes (6 bytes) -
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array)
    //
    //   - LED output (5 bits + 3 padding) -
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) - padding
    //
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keycodes::*;

    #[test]
    fn press_fills_first_free_slot() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_A).unwrap();
        report.press(KEY_B).unwrap();
        report.release(KEY_A);
        report.press(KEY_C).unwrap();
        assert_eq!(report.keycodes, [KEY_C, KEY_B, 0, 0, 0, 0]);
    }

    #[test]
    fn repeated_press_does_not_duplicate() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_H).unwrap();
        report.press(KEY_H).unwrap();
        assert_eq!(report.held_keys(), 1);
    }

    #[test]
    fn modifier_press_is_idempotent() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_LEFT_SHIFT).unwrap();
        report.press(KEY_LEFT_SHIFT).unwrap();
        assert_eq!(report.modifier, MOD_LEFT_SHIFT);
        assert_eq!(report.held_keys(), 0);
    }

    #[test]
    fn seventh_key_exhausts_slots() {
        let mut report = KeyboardReport::empty();
        for key in KEY_A..KEY_A + KEY_SLOTS as u8 {
            report.press(key).unwrap();
        }
        assert_eq!(report.press(KEY_Z), Err(Error::SlotsExhausted));
        assert_eq!(report.keycodes, [KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F]);
        // Modifiers never need a slot.
        assert_eq!(report.press(KEY_RIGHT_ALT), Ok(()));
    }

    #[test]
    fn release_of_unpressed_key_is_noop() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_A).unwrap();
        let before = report.to_bytes();
        report.release(KEY_B);
        report.release(KEY_LEFT_GUI);
        assert_eq!(report.to_bytes(), before);
    }

    #[test]
    fn null_key_is_ignored() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_NONE).unwrap();
        report.release(KEY_NONE);
        assert!(report.is_empty());
    }

    #[test]
    fn serialize_layout() {
        let mut report = KeyboardReport::empty();
        report.press(KEY_LEFT_CTRL).unwrap();
        report.press(KEY_A).unwrap();
        assert_eq!(report.to_bytes(), [0x01, 0x00, 0x04, 0, 0, 0, 0, 0]);

        let mut small = [0u8; 4];
        assert_eq!(report.serialize(&mut small), 0);
    }

    #[test]
    fn led_report_decoding() {
        let leds = LedReport::from_output_bytes(&[0x03]);
        assert!(leds.num_lock());
        assert!(leds.caps_lock());
        assert!(!leds.scroll_lock());
        assert!(!leds.compose());
        let leds = LedReport::from_output_bytes(&[0x18]);
        assert!(leds.compose());
        assert!(leds.kana());
        assert!(!leds.num_lock());
        assert_eq!(LedReport::from_output_bytes(&[]), LedReport(0));
        assert_eq!(LedReport::from_output_bytes(&[0xFF]).0, 0x1F);
    }

    #[test]
    fn descriptor_is_a_closed_keyboard_collection() {
        assert_eq!(&KEYBOARD_REPORT_DESCRIPTOR[..4], &[0x05, 0x01, 0x09, 0x06]);
        assert_eq!(KEYBOARD_REPORT_DESCRIPTOR.last(), Some(&0xC0));
    }
}
