//! HID keyboard reports and their delivery to connected hosts.

pub mod dispatcher;
pub mod keyboard;
pub mod keycodes;
