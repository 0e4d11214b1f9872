//! Edge-triggered work-available signal.
//!
//! `notify` sets a pending flag and wakes one waiter; `wait` returns the
//! flag and always clears it. A consumer that wakes must drain everything
//! it can, because further events below the signal threshold will not
//! wake it again.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::lock_or_recover;

#[derive(Debug, Default)]
pub struct WorkSignal {
    pending: Mutex<bool>,
    cv: Condvar,
}

impl WorkSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark work as available and wake one waiter.
    pub fn notify(&self) {
        *lock_or_recover(&self.pending) = true;
        self.cv.notify_one();
    }

    /// Block until notified or `timeout` elapses (`None` waits forever).
    ///
    /// Returns whether work was signalled; the pending flag is cleared
    /// either way.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = lock_or_recover(&self.pending);
        let mut guard = match timeout {
            None => self
                .cv
                .wait_while(guard, |pending| !*pending)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.cv
                    .wait_timeout_while(guard, timeout, |pending| !*pending)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        std::mem::replace(&mut *guard, false)
    }

    /// Peek at the pending flag without clearing it.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        *lock_or_recover(&self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out_without_notify() {
        let signal = WorkSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Some(Duration::from_millis(20))));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_notify_before_wait_is_not_lost() {
        let signal = WorkSignal::new();
        signal.notify();
        assert!(signal.is_pending());
        assert!(signal.wait(Some(Duration::ZERO)));
    }

    #[test]
    fn test_wait_clears_pending() {
        let signal = WorkSignal::new();
        signal.notify();
        assert!(signal.wait(None));
        assert!(!signal.is_pending());
        assert!(!signal.wait(Some(Duration::from_millis(5))));
    }

    #[test]
    fn test_notify_wakes_blocked_waiter() {
        let signal = Arc::new(WorkSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            std::thread::spawn(move || signal.wait(Some(Duration::from_secs(5))))
        };
        std::thread::sleep(Duration::from_millis(20));
        signal.notify();
        assert!(waiter.join().unwrap());
    }
}
