//! Restart-on-edge debouncer.
//!
//! Every raw edge pushes the settle deadline out by the full window, so a
//! bounce storm collapses into one sample taken after the contacts have
//! been quiet for `window_ms`. Time is plain milliseconds; the caller owns
//! the clock.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    window_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            deadline: None,
        }
    }

    /// Record a raw edge at `now_ms`, restarting the quiet window.
    pub fn on_edge(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.window_ms));
    }

    /// When the pending sample is due, if an edge is pending.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` once per settled burst, when `now_ms` passes the deadline.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Like [`poll`](Self::poll), yielding the level read at settle time.
    pub fn settle(&mut self, now_ms: u64, level: impl FnOnce() -> bool) -> Option<bool> {
        self.poll(now_ms).then(level)
    }
}
