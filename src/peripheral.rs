//! The keyboard's shared state: connected centrals plus the report they
//! are sent.
//!
//! One instance lives for the whole boot. The BLE glue feeds it
//! connection events, the input task feeds it key edges, and the sleep
//! path tears it down.

use crate::ble::conn_table::{ConnHandle, ProtocolMode};
use crate::ble::link::{BleStack, ConnectionEvents, LinkManager, ProtocolModeEvent};
use crate::config::WAKE_TAP_KEY;
use crate::error::Error;
use crate::hid::dispatcher::{HidDispatcher, ReportSink};
use crate::hid::keyboard::KeyboardReport;

pub struct KeyboardPeripheral<const K: usize> {
    links: LinkManager<K>,
    hid: HidDispatcher,
}

impl<const K: usize> KeyboardPeripheral<K> {
    pub const fn new() -> Self {
        Self {
            links: LinkManager::new(),
            hid: HidDispatcher::new(),
        }
    }

    pub fn links(&self) -> &LinkManager<K> {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkManager<K> {
        &mut self.links
    }

    pub fn report(&self) -> &KeyboardReport {
        self.hid.report()
    }

    pub fn any_connected(&self) -> bool {
        self.links.any_connected()
    }

    pub fn mode_of(&self, conn: ConnHandle) -> Option<ProtocolMode> {
        self.links.clients().mode_of(conn)
    }

    pub fn press<S: ReportSink>(&mut self, keys: &[u8], sink: &mut S) -> Result<(), Error> {
        self.hid.press(keys, self.links.clients(), sink)
    }

    pub fn release<S: ReportSink>(&mut self, keys: &[u8], sink: &mut S) -> Result<(), Error> {
        self.hid.release(keys, self.links.clients(), sink)
    }

    /// Tap (press then release) the wake key so the host sees us return.
    pub fn courtesy_tap<S: ReportSink>(&mut self, sink: &mut S) -> Result<(), Error> {
        info!("Sending wake tap");
        let pressed = self.press(&[WAKE_TAP_KEY], sink);
        let released = self.release(&[WAKE_TAP_KEY], sink);
        pressed.and(released)
    }
}

impl<const K: usize> Default for KeyboardPeripheral<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BleStack, const K: usize> ConnectionEvents<S> for KeyboardPeripheral<K> {
    fn on_connected(&mut self, stack: &mut S, conn: ConnHandle, status: u8) {
        self.links.on_connected(stack, conn, status);
    }

    fn on_disconnected(&mut self, stack: &mut S, conn: ConnHandle, reason: u8) {
        self.links.on_disconnected(stack, conn, reason);
    }

    fn on_protocol_mode_changed(&mut self, conn: ConnHandle, event: ProtocolModeEvent) {
        ConnectionEvents::<S>::on_protocol_mode_changed(&mut self.links, conn, event);
    }
}
