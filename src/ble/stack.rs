//! SoftDevice glue: advertising, per-connection GATT tasks and the shared
//! keyboard state.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::peripheral::{self, ConnectableAdvertisement};
use nrf_softdevice::ble::{gatt_server, Connection};
use nrf_softdevice::{raw, Softdevice};

use crate::ble::adv::{self, ADV_PAYLOAD_MAX};
use crate::ble::conn_table::{ConnHandle, ProtocolMode};
use crate::ble::gatt::{BatteryServiceEvent, HidServiceEvent, Server, ServerEvent};
use crate::ble::link::{
    BleStack, ConnectionEvents, ProtocolModeEvent, HCI_REMOTE_USER_TERMINATED, HCI_SUCCESS,
};
use crate::ble::security;
use crate::config::{
    BLE_ADV_INTERVAL, BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN, BLE_SLAVE_LATENCY,
    BLE_SUP_TIMEOUT, DEVICE_APPEARANCE, DEVICE_NAME, MAX_CLIENTS,
};
use crate::error::Error;
use crate::hid::dispatcher::ReportSink;
use crate::hid::keyboard::{LedReport, KEYBOARD_REPORT_SIZE};
use crate::peripheral::KeyboardPeripheral;
use crate::power::runtime;

/// Connected centrals plus the keyboard report, shared by the BLE, input and sleep tasks.
pub static KEYBOARD: Mutex<CriticalSectionRawMutex, KeyboardPeripheral<MAX_CLIENTS>> =
    Mutex::new(KeyboardPeripheral::new());

/// Live `Connection` objects, registered with the HID service on connect.
static HID_LINKS: BlockingMutex<CriticalSectionRawMutex, RefCell<Vec<Connection, MAX_CLIENTS>>> =
    BlockingMutex::new(RefCell::new(Vec::new()));

static ADV_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
enum AdvCommand {
    Start,
    Stop,
}

static ADV_CMD: Signal<CriticalSectionRawMutex, AdvCommand> = Signal::new();

/// Protocol-mode writes, handed from the GATT callback to `hid_event_task`.
static PROTOCOL_EVENTS: Channel<CriticalSectionRawMutex, (ConnHandle, ProtocolModeEvent), 4> =
    Channel::new();

/// [`BleStack`] and [`ReportSink`] on top of the SoftDevice.
pub struct SoftdeviceStack {
    server: &'static Server,
}

impl SoftdeviceStack {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }

    fn with_link<R>(&self, conn: ConnHandle, f: impl FnOnce(&Connection) -> R) -> Option<R> {
        HID_LINKS.lock(|links| {
            links
                .borrow()
                .iter()
                .find(|c| c.handle() == Some(conn.0))
                .map(f)
        })
    }
}

pub fn is_advertising() -> bool {
    ADV_ACTIVE.load(Ordering::Acquire)
}

impl BleStack for SoftdeviceStack {
    fn start_advertising(&mut self) -> Result<(), Error> {
        if ADV_ACTIVE.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInProgress);
        }
        ADV_CMD.signal(AdvCommand::Start);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), Error> {
        if ADV_ACTIVE.swap(false, Ordering::AcqRel) {
            ADV_CMD.signal(AdvCommand::Stop);
        }
        Ok(())
    }

    fn hid_connected(&mut self, conn: ConnHandle) -> Result<(), Error> {
        // The connection itself is registered by `connection_task`, which owns it.
        if self.with_link(conn, |_| ()).is_some() {
            Ok(())
        } else {
            Err(Error::ConnectionNotFound)
        }
    }

    fn hid_disconnected(&mut self, conn: ConnHandle) -> Result<(), Error> {
        HID_LINKS.lock(|links| {
            let mut links = links.borrow_mut();
            let index = links
                .iter()
                .position(|c| c.handle() == Some(conn.0))
                .ok_or(Error::ConnectionNotFound)?;
            links.swap_remove(index);
            Ok(())
        })
    }

    fn disconnect(&mut self, conn: ConnHandle, reason: u8) -> Result<(), Error> {
        debug!("Terminating {} (reason {:#04x})", conn, reason);
        // Links already dropped from the HID registry are looked up by raw handle.
        let result = self
            .with_link(conn, |c| c.disconnect())
            .or_else(|| Connection::from_handle(conn.0).map(|c| c.disconnect()))
            .ok_or(Error::ConnectionNotFound)?;
        result.map_err(|_| Error::DisconnectFailed)
    }
}

impl ReportSink for SoftdeviceStack {
    fn send_input_report(
        &mut self,
        conn: ConnHandle,
        mode: ProtocolMode,
        report: &[u8; KEYBOARD_REPORT_SIZE],
    ) -> Result<(), Error> {
        let hid = &self.server.hid;
        self.with_link(conn, |c| match mode {
            ProtocolMode::Boot => hid.boot_input_report_notify(c, report),
            ProtocolMode::Report => hid.input_report_notify(c, report),
        })
        .ok_or(Error::ConnectionNotFound)?
        .map_err(|_| Error::SendFailed)
    }
}

/// Notify the battery level to every live connection, best effort.
pub fn notify_battery(server: &Server, level: u8) {
    if server.bas.battery_level_set(&level).is_err() {
        warn!("Battery level set failed");
    }
    HID_LINKS.lock(|links| {
        for conn in links.borrow().iter() {
            if server.bas.battery_level_notify(conn, &level).is_err() {
                debug!("Battery notify skipped for {:?}", conn.handle());
            }
        }
    });
}

// Flags (3) + appearance (4) + name header (2) + name must fit one PDU.
const _: () = assert!(
    9 + DEVICE_NAME.len() <= ADV_PAYLOAD_MAX,
    "DEVICE_NAME too long to advertise"
);

async fn wait_for_start() {
    while !ADV_ACTIVE.load(Ordering::Acquire) {
        ADV_CMD.wait().await;
    }
}

async fn wait_for_stop() {
    loop {
        if ADV_CMD.wait().await == AdvCommand::Stop {
            return;
        }
    }
}

/// Advertise whenever asked to and hand each new connection to its own task.
#[embassy_executor::task]
pub async fn advertiser_task(sd: &'static Softdevice, server: &'static Server, spawner: Spawner) {
    let bonder = security::bonder();
    let adv_data = match adv::advertising_data(DEVICE_NAME, DEVICE_APPEARANCE) {
        Ok(data) => data,
        Err(e) => {
            error!("Advertising payload: {}", e);
            return;
        }
    };
    let scan_data = adv::scan_response_data();
    let config = peripheral::Config {
        interval: BLE_ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        wait_for_start().await;

        let advertisement = ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &scan_data,
        };
        match select(
            peripheral::advertise_pairable(sd, advertisement, &config, bonder),
            wait_for_stop(),
        )
        .await
        {
            Either::First(Ok(conn)) => {
                // The SoftDevice stops advertising when a central connects.
                ADV_ACTIVE.store(false, Ordering::Release);
                if spawner.spawn(connection_task(server, conn)).is_err() {
                    warn!("No connection task free, dropping link");
                }
            }
            Either::First(Err(_)) => {
                ADV_ACTIVE.store(false, Ordering::Release);
                warn!("Advertising failed, waiting for the next start request");
            }
            Either::Second(()) => {
                info!("Advertising stopped");
            }
        }
    }
}

/// Serve one central until it disconnects.
#[embassy_executor::task(pool_size = MAX_CLIENTS)]
async fn connection_task(server: &'static Server, conn: Connection) {
    let Some(raw_handle) = conn.handle() else {
        return;
    };
    let handle = ConnHandle(raw_handle);
    let mut stack = SoftdeviceStack::new(server);

    if conn
        .set_conn_params(raw::ble_gap_conn_params_t {
            min_conn_interval: BLE_CONN_INTERVAL_MIN,
            max_conn_interval: BLE_CONN_INTERVAL_MAX,
            slave_latency: BLE_SLAVE_LATENCY,
            conn_sup_timeout: BLE_SUP_TIMEOUT,
        })
        .is_err()
    {
        warn!("Connection parameter request failed");
    }

    let registered = HID_LINKS.lock(|links| links.borrow_mut().push(conn.clone()).is_ok());
    if !registered {
        warn!("HID registry full, refusing {}", handle);
        let _ = conn.disconnect();
        return;
    }

    KEYBOARD
        .lock()
        .await
        .on_connected(&mut stack, handle, HCI_SUCCESS);
    runtime::reset_idle_timer();

    gatt_server::run(&conn, server, |e| match e {
        ServerEvent::Bas(e) => match e {
            BatteryServiceEvent::BatteryLevelCccdWrite { notifications } => {
                debug!("Battery notifications: {}", notifications);
            }
        },
        ServerEvent::Hid(e) => match e {
            HidServiceEvent::ProtocolModeWrite(value) => match ProtocolModeEvent::from_gatt(value) {
                Some(event) => {
                    if PROTOCOL_EVENTS.try_send((handle, event)).is_err() {
                        warn!("Protocol mode event dropped");
                    }
                }
                None => warn!("Invalid protocol mode {}", value),
            },
            HidServiceEvent::OutputReportWrite(data) | HidServiceEvent::BootOutputReportWrite(data) => {
                let leds = LedReport::from_output_bytes(&data);
                info!(
                    "Host LEDs: num={} caps={} scroll={}",
                    leds.num_lock(),
                    leds.caps_lock(),
                    leds.scroll_lock()
                );
            }
            HidServiceEvent::InputReportCccdWrite { notifications } => {
                debug!("Input report notifications: {}", notifications);
            }
            HidServiceEvent::BootInputReportCccdWrite { notifications } => {
                debug!("Boot input notifications: {}", notifications);
            }
            HidServiceEvent::ControlPointWrite(value) => {
                debug!("HID control point: {}", value);
            }
        },
    })
    .await;
    debug!("GATT server for {} ended", handle);

    KEYBOARD
        .lock()
        .await
        .on_disconnected(&mut stack, handle, HCI_REMOTE_USER_TERMINATED);
}

/// Apply protocol-mode writes to the shared connection table.
#[embassy_executor::task]
pub async fn hid_event_task() {
    loop {
        let (conn, event) = PROTOCOL_EVENTS.receive().await;
        let mut kb = KEYBOARD.lock().await;
        ConnectionEvents::<SoftdeviceStack>::on_protocol_mode_changed(&mut *kb, conn, event);
    }
}

/// Kick off advertising at boot.
pub async fn start(server: &'static Server) {
    let mut stack = SoftdeviceStack::new(server);
    if let Err(e) = KEYBOARD.lock().await.links_mut().start_advertising(&mut stack) {
        error!("Advertising failed to start: {}", e);
    }
}
