//! Inactivity countdown.
//!
//! A single deadline measured in milliseconds of monotonic time. The owner
//! polls it; `poll` reports expiry exactly once. After that the timer is
//! spent for the rest of the boot and ignores further `start`/`reset`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdleTimer {
    timeout_ms: u64,
    deadline: Option<u64>,
    fired: bool,
}

impl IdleTimer {
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            deadline: None,
            fired: false,
        }
    }

    pub const fn from_secs(timeout_secs: u64) -> Self {
        Self::new(timeout_secs * 1000)
    }

    /// Arm the timer to expire `timeout` after `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        if self.fired {
            return;
        }
        self.deadline = Some(now_ms.saturating_add(self.timeout_ms));
    }

    /// Stop and re-arm: the deadline moves to `now_ms + timeout`.
    pub fn reset(&mut self, now_ms: u64) {
        self.stop();
        self.start(now_ms);
    }

    /// Cancel without firing.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns `true` once, the first time `now_ms` reaches the deadline.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                self.fired = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = IdleTimer::new(30_000);
        timer.start(0);
        assert!(!timer.poll(29_999));
        assert!(timer.poll(30_000));
        assert!(!timer.poll(60_000));
        assert!(timer.has_fired());
    }

    #[test]
    fn reset_just_before_expiry_extends_deadline() {
        let t = 30_000;
        let mut timer = IdleTimer::new(t);
        timer.start(0);
        timer.reset(t - 1);
        assert!(!timer.poll(t));
        assert!(!timer.poll(t - 1 + t - 1));
        assert!(timer.poll(t - 1 + t));
    }

    #[test]
    fn stopped_timer_never_fires() {
        let mut timer = IdleTimer::from_secs(1);
        timer.start(0);
        timer.stop();
        assert!(!timer.poll(u64::MAX));
        assert!(!timer.is_armed());
    }

    #[test]
    fn late_reset_after_expiry_is_ignored() {
        let mut timer = IdleTimer::new(10);
        timer.start(0);
        assert!(timer.poll(10));
        timer.reset(11);
        assert_eq!(timer.deadline(), None);
        assert!(!timer.poll(100));
    }
}
