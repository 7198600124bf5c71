//! Idle teardown sequence ending in system-off.

use embedded_hal_async::delay::DelayNs;

use crate::ble::link::{BleStack, LinkManager};
use crate::config::{ADVERTISING_SETTLE_MS, DISCONNECT_GRACE_MS, SLEEP_GRACE_MS};
use crate::error::Error;

/// Waits used by the teardown sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepTimings {
    /// After disconnect requests, before the slots are cleared.
    pub disconnect_grace_ms: u32,
    /// After advertising is stopped.
    pub advertising_settle_ms: u32,
    /// After the BLE teardown, before system-off.
    pub sleep_grace_ms: u32,
}

impl SleepTimings {
    pub const DEFAULT: Self = Self {
        disconnect_grace_ms: DISCONNECT_GRACE_MS,
        advertising_settle_ms: ADVERTISING_SETTLE_MS,
        sleep_grace_ms: SLEEP_GRACE_MS,
    };
}

impl Default for SleepTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A peripheral that must be powered down before system-off.
#[allow(async_fn_in_trait)]
pub trait AuxPeripheral {
    async fn power_down(&mut self) -> Result<(), Error>;
}

impl AuxPeripheral for () {
    async fn power_down(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// An absent peripheral (failed probe) has nothing to power down.
impl<A: AuxPeripheral> AuxPeripheral for Option<A> {
    async fn power_down(&mut self) -> Result<(), Error> {
        match self {
            Some(aux) => aux.power_down().await,
            None => Ok(()),
        }
    }
}

/// Enters the deepest power state. Never returns.
pub trait SystemOff {
    fn system_off(&mut self) -> !;
}

/// Everything up to, but not including, system-off.
///
/// Each step is best effort; a failure is logged and the next step runs.
pub async fn prepare_for_sleep<A, S, D, const K: usize>(
    aux: &mut A,
    links: &mut LinkManager<K>,
    stack: &mut S,
    delay: &mut D,
    timings: &SleepTimings,
) where
    A: AuxPeripheral,
    S: BleStack,
    D: DelayNs,
{
    info!("Idle timeout, preparing for system-off");

    if let Err(e) = aux.power_down().await {
        error!("Auxiliary power-down failed: {}", e);
    }

    links.disconnect_all_safely(stack, delay, timings).await;

    info!("Sleeping in {} ms", timings.sleep_grace_ms);
    delay.delay_ms(timings.sleep_grace_ms).await;
}

/// Run the full teardown and power off.
pub async fn enter_sleep<A, S, D, O, const K: usize>(
    aux: &mut A,
    links: &mut LinkManager<K>,
    stack: &mut S,
    delay: &mut D,
    off: &mut O,
    timings: &SleepTimings,
) -> !
where
    A: AuxPeripheral,
    S: BleStack,
    D: DelayNs,
    O: SystemOff,
{
    prepare_for_sleep(aux, links, stack, delay, timings).await;
    info!("Entering system-off");
    off.system_off()
}
