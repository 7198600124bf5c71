//! Single-consumption flag.
//!
//! Armed by one context, consumed by exactly one later reader: `take`
//! reads and clears in one atomic step, so two readers can never both
//! observe the same arming.

use core::sync::atomic::{AtomicBool, Ordering};

pub struct OneShot {
    armed: AtomicBool,
}

impl OneShot {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
        }
    }

    pub const fn armed() -> Self {
        Self {
            armed: AtomicBool::new(true),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Consume the flag. Returns whether it was armed.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

impl Default for OneShot {
    fn default() -> Self {
        Self::new()
    }
}
