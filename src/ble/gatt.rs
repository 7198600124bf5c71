//! GATT layout: Battery Service and HID Service (HID over GATT, keyboard only).

use crate::hid::keyboard::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};

const NO_DATA: &[u8] = &[];
// Report Reference descriptor: report id 0, type input (1) / output (2).
const INPUT_REPORT_REF: [u8; 2] = [0, 1];
const OUTPUT_REPORT_REF: [u8; 2] = [0, 2];
const BOOT_INPUT_REPORT_VALUE: [u8; KEYBOARD_REPORT_SIZE] = [0; KEYBOARD_REPORT_SIZE];
const BOOT_OUTPUT_REPORT_VALUE: [u8; 1] = [0; 1];
const HID_INFORMATION_VALUE: [u8; 4] = [
    HID_SPEC_VERSION as u8,
    (HID_SPEC_VERSION >> 8) as u8,
    COUNTRY_CODE,
    HID_INFO_FLAGS,
];
const CONTROL_POINT_VALUE: [u8; 1] = [0; 1];
// Report protocol until a host asks for boot.
const PROTOCOL_MODE_VALUE: [u8; 1] = [1];

const HID_SPEC_VERSION: u16 = 0x0101;
const COUNTRY_CODE: u8 = 0;
const HID_INFO_FLAG_REMOTE_WAKE: u8 = 0x01;
const HID_INFO_FLAG_NORMALLY_CONNECTABLE: u8 = 0x02;
const HID_INFO_FLAGS: u8 = HID_INFO_FLAG_REMOTE_WAKE | HID_INFO_FLAG_NORMALLY_CONNECTABLE;

const REPORT_MAP_LEN: usize = KEYBOARD_REPORT_DESCRIPTOR.len();

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", security = "justworks", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_service(uuid = "1812")]
pub struct HidService {
    #[characteristic(
        uuid = "2A4A",
        initial_value = "HID_INFORMATION_VALUE",
        security = "justworks",
        read
    )]
    pub hid_information: [u8; 4],
    #[characteristic(
        uuid = "2A4B",
        initial_value = "KEYBOARD_REPORT_DESCRIPTOR",
        security = "justworks",
        read
    )]
    pub report_map: [u8; REPORT_MAP_LEN],
    #[characteristic(
        uuid = "2A4D",
        initial_value = "NO_DATA",
        security = "justworks",
        read,
        notify,
        descriptor(uuid = "2908", security = "justworks", value = "INPUT_REPORT_REF")
    )]
    pub input_report: [u8; KEYBOARD_REPORT_SIZE],
    #[characteristic(
        uuid = "2A4D",
        initial_value = "NO_DATA",
        security = "justworks",
        read,
        write,
        write_without_response,
        descriptor(uuid = "2908", security = "justworks", value = "OUTPUT_REPORT_REF")
    )]
    pub output_report: [u8; 1],
    #[characteristic(
        uuid = "2A22",
        initial_value = "BOOT_INPUT_REPORT_VALUE",
        security = "justworks",
        read,
        notify
    )]
    pub boot_input_report: [u8; KEYBOARD_REPORT_SIZE],
    #[characteristic(
        uuid = "2A32",
        initial_value = "BOOT_OUTPUT_REPORT_VALUE",
        security = "justworks",
        read,
        write,
        write_without_response
    )]
    pub boot_output_report: [u8; 1],
    #[characteristic(
        uuid = "2A4E",
        initial_value = "PROTOCOL_MODE_VALUE",
        security = "justworks",
        read,
        write_without_response
    )]
    pub protocol_mode: u8,
    #[characteristic(
        uuid = "2A4C",
        initial_value = "CONTROL_POINT_VALUE",
        security = "justworks",
        write_without_response
    )]
    pub control_point: u8,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub hid: HidService,
}
