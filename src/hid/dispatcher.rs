//! Keyboard report fan-out.
//!
//! Every press or release updates the single keyboard report and sends the
//! whole report to every live connection, on the characteristic that
//! matches that connection's protocol mode.

use crate::ble::conn_table::{ConnHandle, ConnectionTable, ProtocolMode};
use crate::error::Error;
use crate::hid::keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};

/// Transmits one input report to one connection.
pub trait ReportSink {
    fn send_input_report(
        &mut self,
        conn: ConnHandle,
        mode: ProtocolMode,
        report: &[u8; KEYBOARD_REPORT_SIZE],
    ) -> Result<(), Error>;
}

#[derive(Default)]
pub struct HidDispatcher {
    report: KeyboardReport,
}

impl HidDispatcher {
    pub const fn new() -> Self {
        Self {
            report: KeyboardReport::empty(),
        }
    }

    pub fn report(&self) -> &KeyboardReport {
        &self.report
    }

    /// Press `keys` in order and broadcast the result.
    ///
    /// The first key that cannot be pressed stops the batch. Keys applied
    /// before it stay pressed and are still broadcast; the error is then
    /// returned.
    pub fn press<S: ReportSink, const K: usize>(
        &mut self,
        keys: &[u8],
        clients: &ConnectionTable<K>,
        sink: &mut S,
    ) -> Result<(), Error> {
        let applied = keys.iter().try_for_each(|&key| self.report.press(key));
        if let Err(e) = applied {
            warn!("Key press dropped: {}", e);
        }
        let sent = self.broadcast(clients, sink);
        applied.and(sent)
    }

    /// Release `keys` and broadcast the result.
    pub fn release<S: ReportSink, const K: usize>(
        &mut self,
        keys: &[u8],
        clients: &ConnectionTable<K>,
        sink: &mut S,
    ) -> Result<(), Error> {
        for &key in keys {
            self.report.release(key);
        }
        self.broadcast(clients, sink)
    }

    /// Send the current report to every live connection.
    ///
    /// A failing connection is logged and skipped; the first failure is
    /// returned once all connections have been tried.
    pub fn broadcast<S: ReportSink, const K: usize>(
        &self,
        clients: &ConnectionTable<K>,
        sink: &mut S,
    ) -> Result<(), Error> {
        let bytes = self.report.to_bytes();
        debug!("Keyboard report {:x}", bytes);

        let mut first_error = None;
        for (conn, mode) in clients.live() {
            if let Err(e) = sink.send_input_report(conn, mode, &bytes) {
                warn!("Report to {} ({}) failed: {}", conn, mode, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use heapless::Vec;

    /// Records every report; connections listed in `failing` refuse them.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Vec<(ConnHandle, ProtocolMode, [u8; KEYBOARD_REPORT_SIZE]), 32>,
        pub failing: Vec<ConnHandle, 4>,
    }

    impl ReportSink for RecordingSink {
        fn send_input_report(
            &mut self,
            conn: ConnHandle,
            mode: ProtocolMode,
            report: &[u8; KEYBOARD_REPORT_SIZE],
        ) -> Result<(), Error> {
            if self.failing.contains(&conn) {
                return Err(Error::SendFailed);
            }
            self.sent.push((conn, mode, *report)).unwrap();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecordingSink;
    use super::*;
    use crate::hid::keycodes::*;

    fn two_clients() -> ConnectionTable<2> {
        let mut table = ConnectionTable::new();
        table.assign(ConnHandle(1)).unwrap();
        table.assign(ConnHandle(2)).unwrap();
        table.set_mode(ConnHandle(2), ProtocolMode::Boot).unwrap();
        table
    }

    #[test]
    fn press_reaches_every_connection_in_its_mode() {
        let clients = two_clients();
        let mut sink = RecordingSink::default();
        let mut hid = HidDispatcher::new();

        hid.press(&[KEY_A], &clients, &mut sink).unwrap();

        let expected = [0, 0, KEY_A, 0, 0, 0, 0, 0];
        assert_eq!(
            sink.sent.as_slice(),
            &[
                (ConnHandle(1), ProtocolMode::Report, expected),
                (ConnHandle(2), ProtocolMode::Boot, expected),
            ]
        );
    }

    #[test]
    fn failing_connection_does_not_starve_the_others() {
        let clients = two_clients();
        let mut sink = RecordingSink::default();
        sink.failing.push(ConnHandle(1)).unwrap();
        let mut hid = HidDispatcher::new();

        assert_eq!(
            hid.press(&[KEY_B], &clients, &mut sink),
            Err(Error::SendFailed)
        );
        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].0, ConnHandle(2));
    }

    #[test]
    fn batch_keeps_keys_before_the_failure() {
        let mut clients = ConnectionTable::<1>::new();
        clients.assign(ConnHandle(1)).unwrap();
        let mut sink = RecordingSink::default();
        let mut hid = HidDispatcher::new();

        hid.press(&[KEY_A, KEY_B, KEY_C, KEY_D, KEY_E], &clients, &mut sink)
            .unwrap();
        assert_eq!(
            hid.press(&[KEY_F, KEY_G, KEY_LEFT_CTRL], &clients, &mut sink),
            Err(Error::SlotsExhausted)
        );

        // F landed, G failed, Ctrl after it was never applied.
        let last = sink.sent.last().unwrap().2;
        assert_eq!(last, [0, 0, KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F]);
    }

    #[test]
    fn release_broadcasts_cleared_report() {
        let mut clients = ConnectionTable::<1>::new();
        clients.assign(ConnHandle(3)).unwrap();
        let mut sink = RecordingSink::default();
        let mut hid = HidDispatcher::new();

        hid.press(&[KEY_LEFT_SHIFT, KEY_H], &clients, &mut sink).unwrap();
        assert_eq!(sink.sent[0].2, [MOD_LEFT_SHIFT, 0, KEY_H, 0, 0, 0, 0, 0]);

        hid.release(&[KEY_H, KEY_LEFT_SHIFT], &clients, &mut sink).unwrap();
        assert_eq!(sink.sent[1].2, [0; KEYBOARD_REPORT_SIZE]);
    }

    #[test]
    fn no_connections_means_no_sends() {
        let clients = ConnectionTable::<2>::new();
        let mut sink = RecordingSink::default();
        let mut hid = HidDispatcher::new();
        hid.press(&[KEY_A], &clients, &mut sink).unwrap();
        assert!(sink.sent.is_empty());
        assert_eq!(hid.report().held_keys(), 1);
    }
}
