//! Connection lifecycle handling.
//!
//! `LinkManager` owns the connection table, the advertising state and the
//! internal-disconnect flag. The BLE glue feeds it connect, disconnect and
//! protocol-mode events; it drives the stack back through [`BleStack`].

use embedded_hal_async::delay::DelayNs;

use crate::ble::conn_table::{ConnHandle, ConnectionTable, ProtocolMode};
use crate::error::Error;
use crate::oneshot::OneShot;
use crate::power::sleep::SleepTimings;

/// HCI status reported by a successful connection.
pub const HCI_SUCCESS: u8 = 0x00;

/// HCI reason "remote user terminated connection".
pub const HCI_REMOTE_USER_TERMINATED: u8 = 0x13;

/// Protocol mode switch requested by a central.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolModeEvent {
    BootEntered,
    ReportEntered,
}

impl ProtocolModeEvent {
    /// Decode a write to the Protocol Mode characteristic.
    pub fn from_gatt(value: u8) -> Option<Self> {
        ProtocolMode::from_gatt(value).map(|mode| match mode {
            ProtocolMode::Boot => ProtocolModeEvent::BootEntered,
            ProtocolMode::Report => ProtocolModeEvent::ReportEntered,
        })
    }

    pub fn mode(self) -> ProtocolMode {
        match self {
            ProtocolModeEvent::BootEntered => ProtocolMode::Boot,
            ProtocolModeEvent::ReportEntered => ProtocolMode::Report,
        }
    }
}

/// What the lifecycle handler needs from the BLE stack.
pub trait BleStack {
    /// Start connectable advertising. Returns `AlreadyInProgress` if it is running.
    fn start_advertising(&mut self) -> Result<(), Error>;

    /// Stop advertising. Stopping while stopped is not an error.
    fn stop_advertising(&mut self) -> Result<(), Error>;

    /// Tell the HID service a central is now attached.
    fn hid_connected(&mut self, conn: ConnHandle) -> Result<(), Error>;

    /// Tell the HID service a central is gone (or about to be).
    fn hid_disconnected(&mut self, conn: ConnHandle) -> Result<(), Error>;

    /// Request termination of one link.
    fn disconnect(&mut self, conn: ConnHandle, reason: u8) -> Result<(), Error>;
}

/// BLE event callbacks delivered by the stack glue.
pub trait ConnectionEvents<S: BleStack> {
    fn on_connected(&mut self, stack: &mut S, conn: ConnHandle, status: u8);
    fn on_disconnected(&mut self, stack: &mut S, conn: ConnHandle, reason: u8);
    fn on_protocol_mode_changed(&mut self, conn: ConnHandle, event: ProtocolModeEvent);
}

pub struct LinkManager<const K: usize> {
    clients: ConnectionTable<K>,
    advertising: bool,
    internal_disconnect: OneShot,
}

impl<const K: usize> LinkManager<K> {
    pub const fn new() -> Self {
        Self {
            clients: ConnectionTable::new(),
            advertising: false,
            internal_disconnect: OneShot::new(),
        }
    }

    pub fn clients(&self) -> &ConnectionTable<K> {
        &self.clients
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn any_connected(&self) -> bool {
        !self.clients.is_empty()
    }

    /// Start advertising; a stack that is already advertising counts as success.
    pub fn start_advertising<S: BleStack>(&mut self, stack: &mut S) -> Result<(), Error> {
        match stack.start_advertising() {
            Ok(()) => {
                info!("Advertising successfully started");
                self.advertising = true;
                Ok(())
            }
            Err(Error::AlreadyInProgress) => {
                debug!("Advertising continued");
                self.advertising = true;
                Ok(())
            }
            Err(e) => {
                warn!("Advertising failed to start: {}", e);
                Err(e)
            }
        }
    }

    pub fn stop_advertising<S: BleStack>(&mut self, stack: &mut S) -> Result<(), Error> {
        let result = stack.stop_advertising();
        self.advertising = false;
        result
    }

    /// Stop every link and forget all clients before system-off.
    ///
    /// Best effort: individual failures are logged and the sequence carries
    /// on. The table is empty and advertising stopped when this returns.
    pub async fn disconnect_all_safely<S: BleStack, D: DelayNs>(
        &mut self,
        stack: &mut S,
        delay: &mut D,
        timings: &SleepTimings,
    ) {
        self.internal_disconnect.arm();

        for (conn, _) in self.clients.live() {
            if let Err(e) = stack.hid_disconnected(conn) {
                debug!("HID disconnect notify for {} failed: {}", conn, e);
            }
            match stack.disconnect(conn, HCI_REMOTE_USER_TERMINATED) {
                Ok(()) => info!("Disconnecting {}", conn),
                Err(e) => warn!("Disconnect of {} failed: {}", conn, e),
            }
        }

        delay.delay_ms(timings.disconnect_grace_ms).await;
        self.clients.clear();

        if let Err(e) = self.stop_advertising(stack) {
            debug!("Advertising stop during teardown: {}", e);
        }
        delay.delay_ms(timings.advertising_settle_ms).await;
        info!("All links closed");
    }
}

impl<const K: usize> Default for LinkManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BleStack, const K: usize> ConnectionEvents<S> for LinkManager<K> {
    fn on_connected(&mut self, stack: &mut S, conn: ConnHandle, status: u8) {
        if status != HCI_SUCCESS {
            warn!("Connection failed (err {:#04x})", status);
            return;
        }
        info!("Connected {}", conn);

        if let Err(e) = stack.hid_connected(conn) {
            warn!("Failed to notify HID service about connection: {}", e);
            return;
        }

        if let Err(e) = self.clients.assign(conn) {
            warn!("No slot for {}: {}", conn, e);
        }

        if self.clients.is_full() {
            if let Err(e) = self.stop_advertising(stack) {
                debug!("Advertising stop: {}", e);
            }
            info!("All {} client slots taken, advertising stopped", K);
        } else {
            let _ = self.start_advertising(stack);
        }
    }

    fn on_disconnected(&mut self, stack: &mut S, conn: ConnHandle, reason: u8) {
        if self.internal_disconnect.take() {
            debug!("Disconnect of {} was requested internally", conn);
            return;
        }
        info!("Disconnected {}, reason {:#04x}", conn, reason);

        if let Err(e) = stack.hid_disconnected(conn) {
            warn!("Failed to notify HID service about disconnection: {}", e);
        }

        if let Err(e) = self.clients.release(conn) {
            warn!("Disconnect for {}: {}", conn, e);
        }

        let _ = self.start_advertising(stack);
    }

    fn on_protocol_mode_changed(&mut self, conn: ConnHandle, event: ProtocolModeEvent) {
        match self.clients.set_mode(conn, event.mode()) {
            Ok(()) => info!("{} switched to {} mode", conn, event.mode()),
            Err(e) => warn!("Protocol mode event for {}: {}", conn, e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{RecordingDelay, RecordingStack, StackCall};
    use super::*;
    use embassy_futures::block_on;

    const TIMINGS: SleepTimings = SleepTimings {
        disconnect_grace_ms: 100,
        advertising_settle_ms: 20,
        sleep_grace_ms: 3000,
    };

    #[test]
    fn connect_fills_slot_and_keeps_advertising() {
        let mut stack = RecordingStack::default();
        let mut links = LinkManager::<2>::new();
        links.start_advertising(&mut stack).unwrap();

        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);

        assert!(links.clients().contains(ConnHandle(1)));
        assert_eq!(links.clients().mode_of(ConnHandle(1)), Some(ProtocolMode::Report));
        assert!(links.is_advertising());
        assert_eq!(stack.count(StackCall::HidConnected(ConnHandle(1))), 1);
    }

    #[test]
    fn failed_connect_changes_nothing() {
        let mut stack = RecordingStack::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), 0x3E);
        assert!(!links.any_connected());
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn full_table_stops_advertising_and_reopens_on_disconnect() {
        let mut stack = RecordingStack::default();
        let mut links = LinkManager::<2>::new();
        links.start_advertising(&mut stack).unwrap();

        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);
        links.on_connected(&mut stack, ConnHandle(2), HCI_SUCCESS);
        assert!(!links.is_advertising());
        assert!(!stack.advertising);

        // A third central sneaking in must not evict anyone.
        links.on_connected(&mut stack, ConnHandle(3), HCI_SUCCESS);
        assert_eq!(links.clients().active_count(), 2);
        assert!(!links.clients().contains(ConnHandle(3)));

        links.on_disconnected(&mut stack, ConnHandle(1), HCI_REMOTE_USER_TERMINATED);
        assert_eq!(links.clients().active_count(), 1);
        assert!(links.is_advertising());
        assert!(stack.advertising);
    }

    #[test]
    fn disconnect_of_unknown_handle_still_restarts_advertising() {
        let mut stack = RecordingStack::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);

        links.on_disconnected(&mut stack, ConnHandle(9), 0x08);

        assert!(links.clients().contains(ConnHandle(1)));
        assert!(links.is_advertising());
    }

    #[test]
    fn protocol_mode_updates_matching_slot_only() {
        let mut stack = RecordingStack::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);

        ConnectionEvents::<RecordingStack>::on_protocol_mode_changed(
            &mut links,
            ConnHandle(1),
            ProtocolModeEvent::BootEntered,
        );
        ConnectionEvents::<RecordingStack>::on_protocol_mode_changed(
            &mut links,
            ConnHandle(5),
            ProtocolModeEvent::BootEntered,
        );

        assert_eq!(links.clients().mode_of(ConnHandle(1)), Some(ProtocolMode::Boot));
        assert_eq!(links.clients().active_count(), 1);
    }

    #[test]
    fn teardown_disconnects_everyone_then_clears() {
        let mut stack = RecordingStack::default();
        let mut delay = RecordingDelay::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);
        links.on_connected(&mut stack, ConnHandle(2), HCI_SUCCESS);
        stack.calls.clear();

        block_on(links.disconnect_all_safely(&mut stack, &mut delay, &TIMINGS));

        assert_eq!(
            stack.calls.as_slice(),
            &[
                StackCall::HidDisconnected(ConnHandle(1)),
                StackCall::Disconnect(ConnHandle(1), HCI_REMOTE_USER_TERMINATED),
                StackCall::HidDisconnected(ConnHandle(2)),
                StackCall::Disconnect(ConnHandle(2), HCI_REMOTE_USER_TERMINATED),
                StackCall::StopAdvertising,
            ]
        );
        assert_eq!(delay.waits_ms.as_slice(), &[100, 20]);
        assert!(!links.any_connected());
        assert!(!links.is_advertising());
    }

    #[test]
    fn teardown_survives_disconnect_failures() {
        let mut stack = RecordingStack {
            fail_disconnect: true,
            ..Default::default()
        };
        let mut delay = RecordingDelay::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);

        block_on(links.disconnect_all_safely(&mut stack, &mut delay, &TIMINGS));

        assert_eq!(
            stack.disconnect(ConnHandle(1), HCI_REMOTE_USER_TERMINATED),
            Err(Error::DisconnectFailed)
        );
        assert!(!links.any_connected());
        assert_eq!(stack.count(StackCall::StopAdvertising), 1);
        assert_eq!(delay.waits_ms.len(), 2);
    }

    #[test]
    fn internal_disconnect_flag_swallows_exactly_one_event() {
        let mut stack = RecordingStack::default();
        let mut delay = RecordingDelay::default();
        let mut links = LinkManager::<2>::new();
        links.on_connected(&mut stack, ConnHandle(1), HCI_SUCCESS);
        block_on(links.disconnect_all_safely(&mut stack, &mut delay, &TIMINGS));
        stack.calls.clear();

        links.on_disconnected(&mut stack, ConnHandle(1), HCI_REMOTE_USER_TERMINATED);
        assert!(stack.calls.is_empty());
        assert!(!links.is_advertising());

        links.on_disconnected(&mut stack, ConnHandle(1), HCI_REMOTE_USER_TERMINATED);
        assert_eq!(stack.count(StackCall::HidDisconnected(ConnHandle(1))), 1);
        assert_eq!(stack.count(StackCall::StartAdvertising), 1);
    }

    #[test]
    fn protocol_mode_event_decoding() {
        assert_eq!(ProtocolModeEvent::from_gatt(0), Some(ProtocolModeEvent::BootEntered));
        assert_eq!(ProtocolModeEvent::from_gatt(1), Some(ProtocolModeEvent::ReportEntered));
        assert_eq!(ProtocolModeEvent::from_gatt(7), None);
    }
}
