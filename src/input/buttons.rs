//! Button tasks and the input consumer.
//!
//! Each button task waits for raw GPIO edges, debounces them and queues
//! the settled level as a [`ButtonEdge`]. A single input task drains the
//! queue into the keyboard.

use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};

use crate::ble::gatt::Server;
use crate::ble::stack::{SoftdeviceStack, KEYBOARD};
use crate::config::{BUTTON_DEBOUNCE_MS, CONNECT_POLL_MS, INPUT_QUEUE_DEPTH};
use crate::input::debounce::Debouncer;
use crate::input::pipeline::{self, Button, ButtonEdge, EdgeOutcome};
use crate::power::runtime::{self, IdleHandle};
use crate::wake::WakeCause;

/// Debounced edges waiting for the input task. Producers never block.
static INPUT_EDGES: Channel<CriticalSectionRawMutex, ButtonEdge, INPUT_QUEUE_DEPTH> =
    Channel::new();

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

#[embassy_executor::task(pool_size = 2)]
pub async fn button_task(pin: AnyPin, button: Button) -> ! {
    let mut input = Input::new(pin, Pull::Up);
    let mut debouncer = Debouncer::new(BUTTON_DEBOUNCE_MS);

    loop {
        let Some(deadline) = debouncer.deadline() else {
            input.wait_for_any_edge().await;
            debouncer.on_edge(now_ms());
            continue;
        };

        match select(
            input.wait_for_any_edge(),
            Timer::at(Instant::from_millis(deadline)),
        )
        .await
        {
            Either::First(()) => debouncer.on_edge(now_ms()),
            Either::Second(()) => {
                if let Some(level) = debouncer.settle(now_ms(), || input.is_high()) {
                    let edge = ButtonEdge::from_level(button, level);
                    debug!("Settled {}", edge);
                    if INPUT_EDGES.try_send(edge).is_err() {
                        warn!("Input queue full, dropping {}", edge);
                    }
                }
            }
        }
    }
}

/// Turn queued edges into key reports.
#[embassy_executor::task]
pub async fn input_task(server: &'static Server, wake: &'static WakeCause) {
    runtime::start_idle_timer();

    // Nobody to type to yet: discard input until a central shows up.
    loop {
        while INPUT_EDGES.try_receive().is_ok() {}
        if KEYBOARD.lock().await.any_connected() {
            break;
        }
        Timer::after_millis(CONNECT_POLL_MS).await;
    }

    let mut stack = SoftdeviceStack::new(server);
    let mut activity = IdleHandle;

    {
        let mut kb = KEYBOARD.lock().await;
        pipeline::on_first_connection(&mut *kb, &mut stack, wake);
    }

    loop {
        let edge = INPUT_EDGES.receive().await;
        let mut kb = KEYBOARD.lock().await;
        match pipeline::process_edge(&mut *kb, &mut stack, &mut activity, edge) {
            EdgeOutcome::Dispatched => debug!("{} sent", edge),
            EdgeOutcome::Dropped | EdgeOutcome::Failed(_) => {}
        }
    }
}
