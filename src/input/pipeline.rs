//! Settled button edges to key presses.

use crate::config::{BUTTON_ACTIVE_LOW, SHIFT_BUTTON_KEY, TEXT_BUTTON_KEY};
use crate::error::Error;
use crate::hid::dispatcher::ReportSink;
use crate::peripheral::KeyboardPeripheral;
use crate::wake::WakeCause;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Types `H`; also the wake button.
    Text,
    /// Left Shift.
    Shift,
}

impl Button {
    pub const fn key(self) -> u8 {
        match self {
            Button::Text => TEXT_BUTTON_KEY,
            Button::Shift => SHIFT_BUTTON_KEY,
        }
    }
}

/// A debounced button transition, as queued for the input task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEdge {
    pub button: Button,
    pub pressed: bool,
}

impl ButtonEdge {
    /// Build an edge from the settled pin level.
    pub const fn from_level(button: Button, level_high: bool) -> Self {
        Self {
            button,
            pressed: level_high != BUTTON_ACTIVE_LOW,
        }
    }
}

/// Receives "user did something" notifications (idle timer re-arm).
pub trait ActivityMonitor {
    fn activity(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// No central connected; the edge was discarded.
    Dropped,
    Dispatched,
    /// Dispatch failed; the edge still counted as activity.
    Failed(Error),
}

/// Handle one queued edge.
///
/// Without a live connection the edge is dropped and does not count as
/// activity. Otherwise the idle timer is re-armed and the button's key is
/// pressed or released.
pub fn process_edge<S, A, const K: usize>(
    kb: &mut KeyboardPeripheral<K>,
    sink: &mut S,
    activity: &mut A,
    edge: ButtonEdge,
) -> EdgeOutcome
where
    S: ReportSink,
    A: ActivityMonitor,
{
    if !kb.any_connected() {
        debug!("No connection, dropping {}", edge);
        return EdgeOutcome::Dropped;
    }

    activity.activity();

    let key = [edge.button.key()];
    let result = if edge.pressed {
        kb.press(&key, sink)
    } else {
        kb.release(&key, sink)
    };

    match result {
        Ok(()) => EdgeOutcome::Dispatched,
        Err(e) => {
            warn!("{} not delivered: {}", edge, e);
            EdgeOutcome::Failed(e)
        }
    }
}

/// Run once when the first central shows up. Taps the wake key if this
/// boot came from the wake button; returns whether it did.
pub fn on_first_connection<S: ReportSink, const K: usize>(
    kb: &mut KeyboardPeripheral<K>,
    sink: &mut S,
    wake: &WakeCause,
) -> bool {
    if !wake.take() {
        return false;
    }
    if let Err(e) = kb.courtesy_tap(sink) {
        warn!("Wake tap failed: {}", e);
    }
    true
}
