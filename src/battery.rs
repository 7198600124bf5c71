//! Simulated battery gauge.
//!
//! The board has no fuel gauge; the level drains by one percent per tick
//! and jumps from 1 straight back to 100, so the Battery Service always has
//! something changing to notify and never reports an empty battery.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedBattery {
    level: u8,
}

impl SimulatedBattery {
    pub const FULL: u8 = 100;

    pub const fn new() -> Self {
        Self { level: Self::FULL }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Advance one tick and return the new level.
    pub fn tick(&mut self) -> u8 {
        self.level = if self.level <= 1 {
            Self::FULL
        } else {
            self.level - 1
        };
        self.level
    }
}

impl Default for SimulatedBattery {
    fn default() -> Self {
        Self::new()
    }
}
