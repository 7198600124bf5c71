//! Idle timer, teardown and system-off on the target.

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals;
use embassy_nrf::peripherals::TWISPI0;
use embassy_nrf::twim::Twim;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Instant, Timer};

use crate::ble::gatt::Server;
use crate::ble::stack::{SoftdeviceStack, KEYBOARD};
use crate::config::{BUTTON_ACTIVE_LOW, IDLE_TIMEOUT_SECS, IMU_SAMPLE_MS, WAKE_PIN};
use crate::imu::Lsm6dso;
use crate::input::pipeline::ActivityMonitor;
use crate::power::idle::IdleTimer;
use crate::power::sleep::{self, SleepTimings, SystemOff};
use crate::wake::WakeLatch;

pub type Imu = Lsm6dso<Twim<'static, TWISPI0>>;

/// The motion sensor, if it answered at boot.
pub static IMU: Mutex<CriticalSectionRawMutex, Option<Imu>> = Mutex::new(None);

static IDLE: BlockingMutex<CriticalSectionRawMutex, RefCell<IdleTimer>> =
    BlockingMutex::new(RefCell::new(IdleTimer::from_secs(IDLE_TIMEOUT_SECS)));

// Wakes `idle_timer_task` whenever the deadline moves.
static IDLE_KICK: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static TEARDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

pub fn start_idle_timer() {
    IDLE.lock(|t| t.borrow_mut().start(now_ms()));
    IDLE_KICK.signal(());
}

pub fn reset_idle_timer() {
    IDLE.lock(|t| t.borrow_mut().reset(now_ms()));
    IDLE_KICK.signal(());
}

/// Input activity re-arms the idle timer.
pub struct IdleHandle;

impl ActivityMonitor for IdleHandle {
    fn activity(&mut self) {
        reset_idle_timer();
    }
}

/// Watch the idle deadline; on expiry hand over to `sleep_task`.
#[embassy_executor::task]
pub async fn idle_timer_task() {
    loop {
        let Some(deadline) = IDLE.lock(|t| t.borrow().deadline()) else {
            IDLE_KICK.wait().await;
            continue;
        };

        match select(IDLE_KICK.wait(), Timer::at(Instant::from_millis(deadline))).await {
            Either::First(()) => debug!("Idle deadline moved"),
            Either::Second(()) => {
                if IDLE.lock(|t| t.borrow_mut().poll(now_ms())) {
                    info!("No activity for {} s", IDLE_TIMEOUT_SECS);
                    TEARDOWN.signal(());
                    return;
                }
            }
        }
    }
}

/// Run the teardown sequence once the idle timer fires. Never comes back.
#[embassy_executor::task]
pub async fn sleep_task(server: &'static Server) {
    TEARDOWN.wait().await;

    let mut imu = IMU.lock().await;
    let mut kb = KEYBOARD.lock().await;
    let mut stack = SoftdeviceStack::new(server);
    let mut off = SoftdeviceOff { wake_pin: WAKE_PIN };

    sleep::enter_sleep(
        &mut *imu,
        kb.links_mut(),
        &mut stack,
        &mut Delay,
        &mut off,
        &SleepTimings::DEFAULT,
    )
    .await
}

/// Log raw motion data while awake.
#[embassy_executor::task]
pub async fn imu_task() {
    loop {
        Timer::after_millis(IMU_SAMPLE_MS).await;
        let mut imu = IMU.lock().await;
        let Some(imu) = imu.as_mut() else {
            return;
        };
        match imu.read_raw().await {
            Ok(sample) => debug!("IMU {}", sample),
            Err(e) => warn!("IMU read failed: {}", e),
        }
    }
}

/// GPIO port 0 `LATCH` register.
pub struct Port0Latch;

impl WakeLatch for Port0Latch {
    fn read_latch(&mut self) -> u32 {
        pac::P0.latch().read().0
    }

    fn clear_latch(&mut self, mask: u32) {
        pac::P0.latch().write(|w| w.0 = mask);
    }
}

/// System-off through the SoftDevice, with the wake button armed.
pub struct SoftdeviceOff {
    wake_pin: u8,
}

impl SoftdeviceOff {
    fn arm_wake_pin(&self) {
        let sense = if BUTTON_ACTIVE_LOW {
            vals::Sense::LOW
        } else {
            vals::Sense::HIGH
        };
        pac::P0.pin_cnf(self.wake_pin as usize).write(|w| {
            w.set_dir(vals::Dir::INPUT);
            w.set_input(vals::Input::CONNECT);
            w.set_pull(vals::Pull::PULLUP);
            w.set_sense(sense);
        });
    }
}

impl SystemOff for SoftdeviceOff {
    fn system_off(&mut self) -> ! {
        self.arm_wake_pin();
        unsafe {
            nrf_softdevice::raw::sd_power_system_off();
        }
        // Only reached under a debugger, where system-off is emulated.
        loop {
            cortex_m::asm::wfe();
        }
    }
}
