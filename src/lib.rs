//! Test-only library interface for blekbd.
//!
//! This module re-exports the pure logic modules that can be tested
//! on the host (no embedded hardware required): keyboard report state,
//! connection bookkeeping, report fan-out, debouncing, the idle timer,
//! the sleep sequence, wake-cause decoding and the IMU register driver.
//!
//! Usage: `cargo test --lib` (unit) or `cargo test` (unit + integration)
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main].
//! This lib.rs provides a separate entry point for host-based testing.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod battery;
pub mod config;
pub mod error;
pub mod imu;
pub mod oneshot;
pub mod peripheral;
pub mod status;
pub mod wake;

// ═══════════════════════════════════════════════════════════════════════════
// Module Re-exports
// ═══════════════════════════════════════════════════════════════════════════

#[path = "hid/keycodes.rs"]
mod hid_keycodes_impl;
#[path = "hid/keyboard.rs"]
mod hid_keyboard_impl;
#[path = "hid/dispatcher.rs"]
mod hid_dispatcher_impl;

#[path = "ble/adv.rs"]
mod ble_adv_impl;
#[path = "ble/conn_table.rs"]
mod ble_conn_table_impl;
#[path = "ble/link.rs"]
mod ble_link_impl;

#[path = "input/debounce.rs"]
mod input_debounce_impl;
#[path = "input/pipeline.rs"]
mod input_pipeline_impl;

#[path = "power/idle.rs"]
mod power_idle_impl;
#[path = "power/sleep.rs"]
mod power_sleep_impl;

pub mod hid {
    pub mod keycodes {
        pub use crate::hid_keycodes_impl::*;
    }
    pub mod keyboard {
        pub use crate::hid_keyboard_impl::*;
    }
    pub mod dispatcher {
        pub use crate::hid_dispatcher_impl::*;
    }

    pub use dispatcher::{HidDispatcher, ReportSink};
    pub use keyboard::{KeyboardReport, LedReport};
}

pub mod ble {
    pub mod adv {
        pub use crate::ble_adv_impl::*;
    }
    pub mod conn_table {
        pub use crate::ble_conn_table_impl::*;
    }
    pub mod link {
        pub use crate::ble_link_impl::*;
    }

    pub use conn_table::{ConnHandle, ConnectionTable, ProtocolMode};
    pub use link::{BleStack, ConnectionEvents, LinkManager, ProtocolModeEvent};
}

pub mod input {
    pub mod debounce {
        pub use crate::input_debounce_impl::*;
    }
    pub mod pipeline {
        pub use crate::input_pipeline_impl::*;
    }
}

pub mod power {
    pub mod idle {
        pub use crate::power_idle_impl::*;
    }
    pub mod sleep {
        pub use crate::power_sleep_impl::*;
    }
}

pub use error::Error;
pub use peripheral::KeyboardPeripheral;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - cross-module properties
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::ble::link::mock::{RecordingDelay, RecordingStack, StackCall};
    use super::ble::link::{HCI_REMOTE_USER_TERMINATED, HCI_SUCCESS};
    use super::ble::*;
    use super::hid::dispatcher::mock::RecordingSink;
    use super::hid::keyboard::KEYBOARD_REPORT_SIZE;
    use super::hid::keycodes::*;
    use super::hid::KeyboardReport;
    use super::power::sleep::{prepare_for_sleep, SleepTimings};
    use super::*;
    use crate::config::KEY_SLOTS;
    use embassy_futures::block_on;
    use proptest::prelude::*;

    fn any_key() -> impl Strategy<Value = u8> {
        prop_oneof![
            Just(KEY_NONE),
            KEY_A..=KEY_H,
            KEY_LEFT_CTRL..=KEY_RIGHT_GUI,
        ]
    }

    fn plain_key() -> impl Strategy<Value = u8> {
        KEY_A..=KEY_Z
    }

    // ════════════════════════════════════════════════════════════════════════
    // Keyboard Report Properties
    // ════════════════════════════════════════════════════════════════════════

    proptest! {
        /// Any press/release sequence keeps key codes unique and the
        /// modifier byte equal to the OR of held control keys.
        #[test]
        fn press_release_never_duplicates_and_tracks_modifiers(
            ops in proptest::collection::vec((any_key(), any::<bool>()), 0..256),
        ) {
            let mut report = KeyboardReport::empty();
            let mut held_modifiers = 0u8;

            for (key, pressed) in ops {
                if pressed {
                    let _ = report.press(key);
                    if let Some(bit) = modifier_bit(key) {
                        held_modifiers |= bit;
                    }
                } else {
                    report.release(key);
                    if let Some(bit) = modifier_bit(key) {
                        held_modifiers &= !bit;
                    }
                }

                for (i, &a) in report.keycodes.iter().enumerate() {
                    if a == KEY_NONE {
                        continue;
                    }
                    prop_assert!(modifier_bit(a).is_none());
                    prop_assert!(!report.keycodes[i + 1..].contains(&a));
                }
                prop_assert_eq!(report.modifier, held_modifiers);
            }
        }

        #[test]
        fn press_then_release_restores_report_bytes(
            held in proptest::collection::vec(plain_key(), 0..KEY_SLOTS),
            shift in any::<bool>(),
            key in plain_key(),
        ) {
            let mut report = KeyboardReport::empty();
            if shift {
                report.press(KEY_LEFT_SHIFT).unwrap();
            }
            for k in held {
                report.press(k).unwrap();
            }
            prop_assume!(!report.keycodes.contains(&key));

            let before = report.to_bytes();
            prop_assert_eq!(report.press(key), Ok(()));
            report.release(key);
            prop_assert_eq!(report.to_bytes(), before);
        }
    }

    #[test]
    fn n_plus_one_keys_exhaust_slots_and_keep_first_n() {
        let mut report = KeyboardReport::empty();
        let keys = [KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_7];
        for &k in &keys[..6] {
            report.press(k).unwrap();
        }
        assert_eq!(report.press(keys[6]), Err(Error::SlotsExhausted));
        assert_eq!(report.keycodes, [KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6]);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Connection Lifecycle Properties
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn k_plus_one_clients_leave_k_slots_and_advertising_stopped() {
        const K: usize = 3;
        let mut stack = RecordingStack::default();
        let mut kb = KeyboardPeripheral::<K>::new();
        kb.links_mut().start_advertising(&mut stack).unwrap();

        for h in 0..=K as u16 {
            kb.on_connected(&mut stack, ConnHandle(h), HCI_SUCCESS);
        }
        assert_eq!(kb.links().clients().active_count(), K);
        assert!(!kb.links().is_advertising());

        kb.on_disconnected(&mut stack, ConnHandle(1), HCI_REMOTE_USER_TERMINATED);
        assert_eq!(kb.links().clients().active_count(), K - 1);
        assert!(kb.links().is_advertising());

        kb.on_connected(&mut stack, ConnHandle(7), HCI_SUCCESS);
        assert_eq!(kb.links().clients().slots()[1].handle, Some(ConnHandle(7)));
    }

    #[test]
    fn teardown_on_empty_table_still_stops_advertising() {
        let mut stack = RecordingStack::default();
        let mut delay = RecordingDelay::default();
        let mut links = LinkManager::<2>::new();

        block_on(links.disconnect_all_safely(&mut stack, &mut delay, &SleepTimings::DEFAULT));
        block_on(links.disconnect_all_safely(&mut stack, &mut delay, &SleepTimings::DEFAULT));

        assert_eq!(stack.count(StackCall::StopAdvertising), 2);
        assert!(!links.any_connected());
    }

    // ════════════════════════════════════════════════════════════════════════
    // End-to-End
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn connect_press_release_then_sleep() {
        let mut stack = RecordingStack::default();
        let mut sink = RecordingSink::default();
        let mut delay = RecordingDelay::default();
        let mut kb = KeyboardPeripheral::<2>::new();

        kb.on_connected(&mut stack, ConnHandle(5), HCI_SUCCESS);
        kb.press(&[KEY_A], &mut sink).unwrap();
        kb.release(&[KEY_A], &mut sink).unwrap();

        assert_eq!(
            sink.sent.as_slice(),
            &[
                (ConnHandle(5), ProtocolMode::Report, [0, 0, KEY_A, 0, 0, 0, 0, 0]),
                (ConnHandle(5), ProtocolMode::Report, [0; KEYBOARD_REPORT_SIZE]),
            ]
        );

        block_on(prepare_for_sleep(
            &mut (),
            kb.links_mut(),
            &mut stack,
            &mut delay,
            &SleepTimings::DEFAULT,
        ));
        assert!(!kb.any_connected());
        assert_eq!(
            stack.count(StackCall::Disconnect(ConnHandle(5), HCI_REMOTE_USER_TERMINATED)),
            1
        );
    }
}
