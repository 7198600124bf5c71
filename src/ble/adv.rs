//! Advertising and scan response payloads.

use heapless::Vec;

use crate::error::Error;

/// Maximum legacy advertising PDU payload.
pub const ADV_PAYLOAD_MAX: usize = 31;

// LE General Discoverable, BR/EDR not supported.
const FLAGS_LE_ONLY_GENERAL_DISC: u8 = 0x06;

const AD_FLAGS: u8 = 0x01;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_APPEARANCE: u8 = 0x19;

const UUID_HID_SERVICE: u16 = 0x1812;
const UUID_BATTERY_SERVICE: u16 = 0x180F;

/// Flags, appearance and complete local name.
pub fn advertising_data(name: &str, appearance: u16) -> Result<Vec<u8, ADV_PAYLOAD_MAX>, Error> {
    let [appearance_lo, appearance_hi] = appearance.to_le_bytes();
    let name_len = u8::try_from(name.len() + 1).map_err(|_| Error::PayloadTooLong)?;

    #[rustfmt::skip]
    let header = [
        0x02, AD_FLAGS, FLAGS_LE_ONLY_GENERAL_DISC,
        0x03, AD_APPEARANCE, appearance_lo, appearance_hi,
        name_len, AD_COMPLETE_LOCAL_NAME,
    ];

    let mut data: Vec<u8, ADV_PAYLOAD_MAX> = Vec::new();
    data.extend_from_slice(&header)
        .and_then(|()| data.extend_from_slice(name.as_bytes()))
        .map_err(|_| Error::PayloadTooLong)?;
    Ok(data)
}

/// Complete list of 16-bit service UUIDs: HID, Battery.
pub fn scan_response_data() -> [u8; 6] {
    let [hid_lo, hid_hi] = UUID_HID_SERVICE.to_le_bytes();
    let [bas_lo, bas_hi] = UUID_BATTERY_SERVICE.to_le_bytes();
    [0x05, AD_UUID16_COMPLETE, hid_lo, hid_hi, bas_lo, bas_hi]
}
