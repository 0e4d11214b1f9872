//! Frame stabilization.
//!
//! Waits until the compositor has produced a run of consecutive valid frames.
//! A window's target frame is valid when
//!
//! - its interval `v2 - v1` is at most 1.5 VSync periods, and
//! - its frame index is exactly one past the previous window's (not checked
//!   for the first window).
//!
//! A failing window resets the streak to zero.
//!
//! ```text
//!  Waiting ──wake/timeout──▶ Draining ──streak >= target──▶ Stable
//!     ▲                         │
//!     └────── streak < target ──┤
//!                               └── nothing received / stream ended /
//!                                   budget spent ──▶ TimedOut
//! ```

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::partitioner::{VSyncPartitioner, VSyncWindow};
use crate::capture::TraceSource;
use crate::config::StabilizationConfig;
use crate::listener::FrameListener;

/// Interval overrun tolerance, in VSync periods.
pub const OVERRUN_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizationState {
    Waiting,
    Draining,
    Stable,
    TimedOut,
}

/// How one analysed window was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVerdict {
    Valid,
    /// Target interval longer than the overrun tolerance
    Overrun,
    /// Frame index did not follow the previous window's
    FrameGap,
}

impl FrameVerdict {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == FrameVerdict::Valid
    }
}

/// Tracks the valid-frame streak across windows.
#[derive(Debug, Clone)]
pub struct FrameStabilizer {
    target_frames: u32,
    vsync_period: f64,
    streak: u32,
    frames_seen: u64,
    last_frame: Option<i64>,
    state: StabilizationState,
}

impl FrameStabilizer {
    #[must_use]
    pub fn new(target_frames: u32, vsync_period: f64) -> Self {
        Self {
            target_frames,
            vsync_period,
            streak: 0,
            frames_seen: 0,
            last_frame: None,
            state: StabilizationState::Waiting,
        }
    }

    #[must_use]
    pub fn from_config(config: &StabilizationConfig) -> Self {
        Self::new(config.target_frames, config.vsync_period)
    }

    /// Judge `window` against the current state without recording it.
    #[must_use]
    pub fn judge(&self, window: &VSyncWindow<'_>) -> FrameVerdict {
        if window.target_interval() > self.vsync_period * OVERRUN_FACTOR {
            FrameVerdict::Overrun
        } else if self.last_frame.is_some_and(|last| window.frame_index != last + 1) {
            FrameVerdict::FrameGap
        } else {
            FrameVerdict::Valid
        }
    }

    /// Judge and record `window`.
    pub fn observe(&mut self, window: &VSyncWindow<'_>) -> FrameVerdict {
        let verdict = self.judge(window);
        if verdict.is_valid() {
            self.streak = self.streak.saturating_add(1);
        } else {
            debug!("Frame {} rejected: {verdict:?}, streak reset", window.frame_index);
            self.streak = 0;
        }
        self.last_frame = Some(window.frame_index);
        self.frames_seen += 1;
        if self.streak >= self.target_frames {
            self.state = StabilizationState::Stable;
        }
        verdict
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    #[must_use]
    pub fn state(&self) -> StabilizationState {
        self.state
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.state == StabilizationState::Stable
    }

    /// Drive `listener` until the streak reaches the target or `timeout`
    /// passes. `on_window` sees every window with its verdict.
    ///
    /// Returns `false` without waiting out the budget when no event arrives
    /// within it at all, or when the capture stream ends first.
    pub fn run<F>(&mut self, listener: &FrameListener, timeout: Duration, mut on_window: F) -> bool
    where
        F: FnMut(&VSyncWindow<'_>, FrameVerdict),
    {
        let started = Instant::now();
        let mut partitioner = VSyncPartitioner::new();
        let mut received_any = false;

        loop {
            self.state = StabilizationState::Waiting;
            let remaining = timeout.saturating_sub(started.elapsed());
            let woke = listener.wait_until_work_available(Some(remaining));
            let terminated = listener.capture_terminated();

            self.state = StabilizationState::Draining;
            let delivered = listener.handle_events(|batch| {
                partitioner.handle_events(batch, |window| {
                    let verdict = self.observe(window);
                    on_window(window, verdict);
                });
            });
            received_any |= delivered > 0;

            // Stable sticks even if a later window in the same drain failed
            if self.is_stable() {
                info!(
                    "Frames stabilized after {} windows in {:?}",
                    self.frames_seen,
                    started.elapsed()
                );
                return true;
            }
            if !woke && !received_any {
                warn!("No trace events received within {timeout:?}");
                self.state = StabilizationState::TimedOut;
                return false;
            }
            if terminated {
                info!("Trace stream ended before frames stabilized (streak {})", self.streak);
                self.state = StabilizationState::TimedOut;
                return false;
            }
            if started.elapsed() > timeout {
                info!("Frame stabilization timed out (streak {})", self.streak);
                self.state = StabilizationState::TimedOut;
                return false;
            }
        }
    }
}

/// Start a listener on `source` and wait for frame stabilization.
///
/// Listener start failures and any queued listener errors are logged; the
/// result is only whether stabilization was reached.
pub fn wait_for_stabilization<S: TraceSource>(source: S, config: &StabilizationConfig) -> bool {
    if let Err(err) = config.validate() {
        error!("{err}");
        return false;
    }
    let listener = match FrameListener::start(source, &config.listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!("{err}");
            return false;
        }
    };

    let mut stabilizer = FrameStabilizer::from_config(config);
    let stable = stabilizer.run(&listener, Duration::from_millis(config.timeout_ms), |_, _| {});
    for err in listener.get_and_clear_errors() {
        warn!("{err}");
    }
    stable
}
