//! blekbd - BLE HID keyboard firmware for nRF52840.
//!
//! Two buttons type into up to `MAX_CLIENTS` hosts at once over HID over
//! GATT. After `IDLE_TIMEOUT_SECS` without input the links are closed, the
//! motion sensor is powered down and the chip enters system-off; the text
//! button wakes it again.
//!
//! Task layout:
//!   - `softdevice_task`   - SoftDevice event pump
//!   - `advertiser_task`   - advertising, spawns one `connection_task` per central
//!   - `hid_event_task`    - protocol-mode writes into the connection table
//!   - `button_task` x2    - GPIO edge, debounce, queue
//!   - `input_task`        - queued edges to key reports
//!   - `idle_timer_task`   - inactivity deadline
//!   - `sleep_task`        - teardown and system-off
//!   - `imu_task`          - 1 Hz motion sensor logging
//!   - main loop           - status LED and simulated battery

#![no_std]
#![no_main]

#[macro_use]
mod fmt;

mod battery;
mod ble;
mod config;
mod error;
mod hid;
mod imu;
mod input;
mod oneshot;
mod peripheral;
mod power;
mod status;
mod wake;

use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive, Pin};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::Timer;
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

use crate::battery::SimulatedBattery;
use crate::ble::gatt::Server;
use crate::config::{DEVICE_NAME, IMU_I2C_ADDR, MAIN_TICK_MS, MAX_CLIENTS, WAKE_PIN};
use crate::imu::Lsm6dso;
use crate::input::pipeline::Button;
use crate::power::runtime::{self, Port0Latch, IMU};
use crate::status::StatusLed;
use crate::wake::WakeCause;

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: MAX_CLIENTS as u8,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: MAX_CLIENTS as u8,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("blekbd v{} starting", env!("CARGO_PKG_VERSION"));

    // The latch must be read before anything reconfigures GPIO.
    static WAKE: StaticCell<WakeCause> = StaticCell::new();
    let wake: &'static WakeCause =
        WAKE.init(wake::inspect_wake_cause(&mut Port0Latch, WAKE_PIN));

    // Priorities 0, 1 and 4 belong to the SoftDevice.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(defmt::unwrap!(Server::new(sd)));
    defmt::unwrap!(spawner.spawn(softdevice_task(sd)));

    // - Motion sensor ---------------------------------------------------
    interrupt::TWISPI0.set_priority(Priority::P3);
    let mut twim_config = twim::Config::default();
    twim_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim_config);
    let mut imu = Lsm6dso::new(i2c, IMU_I2C_ADDR);
    match imu.init().await {
        Ok(()) => {
            info!("IMU ready");
            *IMU.lock().await = Some(imu);
            defmt::unwrap!(spawner.spawn(runtime::imu_task()));
        }
        Err(e) => error!("IMU init failed: {}", e),
    }

    // - BLE, input, power ---------------------------------------------------
    defmt::unwrap!(spawner.spawn(ble::stack::advertiser_task(sd, server, spawner)));
    defmt::unwrap!(spawner.spawn(ble::stack::hid_event_task()));
    defmt::unwrap!(spawner.spawn(input::buttons::button_task(
        p.P0_11.degrade(),
        Button::Text
    )));
    defmt::unwrap!(spawner.spawn(input::buttons::button_task(
        p.P0_12.degrade(),
        Button::Shift
    )));
    defmt::unwrap!(spawner.spawn(input::buttons::input_task(server, wake)));
    defmt::unwrap!(spawner.spawn(runtime::idle_timer_task()));
    defmt::unwrap!(spawner.spawn(runtime::sleep_task(server)));

    ble::stack::start(server).await;

    let mut led = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let mut status = StatusLed::new();
    let mut battery = SimulatedBattery::new();

    loop {
        Timer::after_millis(MAIN_TICK_MS).await;
        let _ = status.drive(&mut led, ble::stack::is_advertising());
        ble::stack::notify_battery(server, battery.tick());
    }
}
