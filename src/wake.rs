//! Boot-time wake cause.
//!
//! On nRF52 the GPIO `LATCH` register records which pins met their SENSE
//! condition. Reading it at boot tells us whether a button press brought
//! the chip out of system-off.

use crate::oneshot::OneShot;

/// Access to the GPIO wake latch.
pub trait WakeLatch {
    fn read_latch(&mut self) -> u32;

    /// Write-1-to-clear the given bits.
    fn clear_latch(&mut self, mask: u32);
}

/// Whether this boot came from the wake button. Consumed at most once.
pub struct WakeCause {
    by_button: OneShot,
}

impl WakeCause {
    pub const fn cold_boot() -> Self {
        Self {
            by_button: OneShot::new(),
        }
    }

    pub const fn button() -> Self {
        Self {
            by_button: OneShot::armed(),
        }
    }

    /// Consume the flag. Returns `true` only for the first call after a button wake.
    pub fn take(&self) -> bool {
        self.by_button.take()
    }

    pub fn woke_by_button(&self) -> bool {
        self.by_button.is_armed()
    }
}

/// Snapshot and clear the wake latch once.
///
/// Only the bits that were read are written back, so a pin latching
/// between the read and the write is left for the next boot.
pub fn inspect_wake_cause<L: WakeLatch>(latch: &mut L, wake_pin: u8) -> WakeCause {
    let bits = latch.read_latch();
    if bits == 0 {
        info!("No GPIO wake latch set, cold boot");
        return WakeCause::cold_boot();
    }

    latch.clear_latch(bits);

    let wake_mask = 1u32.checked_shl(u32::from(wake_pin)).unwrap_or(0);
    if bits & wake_mask != 0 {
        info!("Woke from system-off via button (latch {:#010x})", bits);
        WakeCause::button()
    } else {
        info!("GPIO latch {:#010x} without wake pin", bits);
        WakeCause::cold_boot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mimics W1C hardware; `late` bits appear after the first read.
    struct FakeLatch {
        value: u32,
        late: u32,
        cleared: Option<u32>,
    }

    impl WakeLatch for FakeLatch {
        fn read_latch(&mut self) -> u32 {
            let v = self.value;
            self.value |= self.late;
            v
        }

        fn clear_latch(&mut self, mask: u32) {
            self.cleared = Some(mask);
            self.value &= !mask;
        }
    }

    #[test]
    fn wake_pin_bit_sets_flag_and_clears_only_read_bits() {
        let mut latch = FakeLatch {
            value: 1 << 11 | 1 << 3,
            late: 1 << 20,
            cleared: None,
        };
        let cause = inspect_wake_cause(&mut latch, 11);

        assert!(cause.woke_by_button());
        assert_eq!(latch.cleared, Some(1 << 11 | 1 << 3));
        assert_eq!(latch.value, 1 << 20);

        assert!(cause.take());
        assert!(!cause.take());
    }

    #[test]
    fn empty_latch_is_a_normal_boot() {
        let mut latch = FakeLatch {
            value: 0,
            late: 0,
            cleared: None,
        };
        let cause = inspect_wake_cause(&mut latch, 11);
        assert!(!cause.take());
        assert_eq!(latch.cleared, None);
    }

    #[test]
    fn out_of_range_wake_pin_never_matches() {
        let mut latch = FakeLatch {
            value: u32::MAX,
            late: 0,
            cleared: None,
        };
        let cause = inspect_wake_cause(&mut latch, 40);
        assert!(!cause.take());
        assert_eq!(latch.cleared, Some(u32::MAX));
    }

    #[test]
    fn other_pins_do_not_count_as_button_wake() {
        let mut latch = FakeLatch {
            value: 1 << 12,
            late: 0,
            cleared: None,
        };
        let cause = inspect_wake_cause(&mut latch, 11);
        assert!(!cause.take());
        assert_eq!(latch.cleared, Some(1 << 12));
    }
}
