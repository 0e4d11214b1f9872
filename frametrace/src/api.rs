//! Flat entry points for embedding hosts.
//!
//! Thin wrappers over [`FrameListener`] and the stabilization driver with
//! the argument conventions hosts expect: millisecond timeouts where `-1`
//! (or any negative value) waits forever, and errors pulled as a list.

use std::time::Duration;

use crate::analysis::wait_for_stabilization;
use crate::capture::TraceSource;
use crate::config::{ListenerConfig, StabilizationConfig};
use crate::domain::ListenerError;
use crate::event::Event;
use crate::listener::FrameListener;

/// Owned listener handle; dropping it stops the session.
pub type ListenerHandle = FrameListener;

/// Start a listener on `source` with default buffer settings.
///
/// # Errors
///
/// Returns [`ListenerError::Initialize`] if the session cannot be started.
pub fn start_listening<S: TraceSource>(
    source: S,
    session_name: &str,
    signal_threshold: usize,
) -> Result<ListenerHandle, ListenerError> {
    let config = ListenerConfig {
        signal_threshold,
        ..ListenerConfig::with_session(session_name)
    };
    FrameListener::start(source, &config)
}

/// Wait for the listener to signal work; negative `timeout_ms` waits forever.
pub fn wait_for_work(handle: &ListenerHandle, timeout_ms: i64) -> bool {
    handle.wait_until_work_available(timeout_from_ms(timeout_ms))
}

/// Drain every buffered event into `callback`, in batches.
pub fn drain_events<F: FnMut(&[Event])>(handle: &ListenerHandle, callback: F) -> usize {
    handle.handle_events(callback)
}

/// Take the listener's queued errors.
#[must_use]
pub fn get_errors(handle: &ListenerHandle) -> Vec<ListenerError> {
    handle.get_and_clear_errors()
}

/// Run a listener on `source` until `target_frames` consecutive valid
/// frames are seen or `timeout_ms` passes.
pub fn wait_for_frame_stabilization<S: TraceSource>(
    source: S,
    target_frames: u32,
    vsync_period: f64,
    timeout_ms: u64,
    session_name: &str,
) -> bool {
    let config = StabilizationConfig {
        target_frames,
        vsync_period,
        timeout_ms,
        listener: ListenerConfig::with_session(session_name),
    };
    wait_for_stabilization(source, &config)
}

fn timeout_from_ms(timeout_ms: i64) -> Option<Duration> {
    u64::try_from(timeout_ms).ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_timeout_means_forever() {
        assert_eq!(timeout_from_ms(-1), None);
        assert_eq!(timeout_from_ms(-50), None);
        assert_eq!(timeout_from_ms(0), Some(Duration::ZERO));
        assert_eq!(timeout_from_ms(250), Some(Duration::from_millis(250)));
    }
}
