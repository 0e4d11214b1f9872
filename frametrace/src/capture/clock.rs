//! High-resolution capture clock
//!
//! Record timestamps are raw ticks; the decoder converts them to seconds
//! with the clock's frequency.

#![allow(unsafe_code)] // clock_gettime() requires unsafe

/// Monotonic tick source with a fixed frequency.
pub trait Clock: Send + Sync {
    /// Current tick count.
    fn now_ticks(&self) -> i64;

    /// Ticks per second.
    fn frequency(&self) -> u64;
}

/// `CLOCK_MONOTONIC` in nanosecond ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub const FREQUENCY: u64 = 1_000_000_000;
}

impl Clock for MonotonicClock {
    fn now_ticks(&self) -> i64 {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // SAFETY: `ts` is a valid, writable timespec and CLOCK_MONOTONIC is
        // always available on supported platforms.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        debug_assert_eq!(rc, 0, "clock_gettime(CLOCK_MONOTONIC) failed");
        #[allow(clippy::useless_conversion)] // time_t/c_long widths vary by target
        {
            i64::from(ts.tv_sec) * 1_000_000_000 + i64::from(ts.tv_nsec)
        }
    }

    fn frequency(&self) -> u64 {
        Self::FREQUENCY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock;
        let a = clock.now_ticks();
        let b = clock.now_ticks();
        assert!(b >= a);
        assert_eq!(clock.frequency(), 1_000_000_000);
    }
}
