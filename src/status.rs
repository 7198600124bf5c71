//! Status LED: blinks while the keyboard is discoverable.

use embedded_hal::digital::OutputPin;

/// Status LED policy: blink while advertising, off otherwise.
///
/// `tick` returns the level to drive, or `None` when the pin should be left
/// alone. The LED is forced off once when advertising ends, not every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusLed {
    on: bool,
    forced_off: bool,
}

impl StatusLed {
    pub const fn new() -> Self {
        Self {
            on: false,
            forced_off: false,
        }
    }

    pub fn tick(&mut self, advertising: bool) -> Option<bool> {
        if advertising {
            self.forced_off = false;
            self.on = !self.on;
            return Some(self.on);
        }
        if self.forced_off {
            return None;
        }
        self.forced_off = true;
        self.on = false;
        Some(false)
    }

    /// Tick and drive `pin` (active high) if the level changes.
    pub fn drive<P: OutputPin>(&mut self, pin: &mut P, advertising: bool) -> Result<(), P::Error> {
        match self.tick(advertising) {
            Some(true) => pin.set_high(),
            Some(false) => pin.set_low(),
            None => Ok(()),
        }
    }
}
