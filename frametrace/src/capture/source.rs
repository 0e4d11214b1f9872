//! The pluggable trace capture facility.
//!
//! A [`TraceSource`] stands in for the platform trace API. The listener
//! drives it through a fixed sequence:
//!
//! 1. `open_session(name)` (after `close_existing(name)` and one retry if
//!    the name is taken)
//! 2. `discover_providers()` then `enable_provider()` for each provider the
//!    listener wants
//! 3. `tick_frequency()` to build the decoder and `controller()` to obtain
//!    a thread-safe stop/flush handle
//! 4. `process(sink)` on the capture thread; it blocks, delivering records,
//!    until the session is stopped or the stream ends

use std::sync::Arc;

use frametrace_common::ProviderGuid;

use super::clock::MonotonicClock;
use crate::domain::SourceError;

/// A raw record as delivered by the trace facility.
///
/// The payload borrows the facility's buffer and is only valid for the
/// duration of the sink call.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    pub provider: ProviderGuid,
    pub event_id: u16,
    pub version: u8,
    /// Ticks on the capture clock
    pub timestamp: i64,
    pub payload: &'a [u8],
}

/// A provider the facility can enable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDesc {
    pub guid: ProviderGuid,
    pub name: String,
}

/// Thread-safe control over a running session.
pub trait SessionControl: Send + Sync {
    /// Halt delivery. `process` must return promptly afterwards.
    ///
    /// # Errors
    /// Returns an error if the facility refuses to stop the session.
    fn stop(&self) -> Result<(), SourceError>;

    /// Ask the facility to flush buffered records to `process`.
    ///
    /// # Errors
    /// Returns an error if the flush request fails.
    fn flush(&self) -> Result<(), SourceError>;
}

/// Platform trace facility abstraction.
pub trait TraceSource: Send + 'static {
    /// Open a realtime session named `session_name`.
    ///
    /// # Errors
    /// [`SourceError::AlreadyExists`] if a session with that name is running;
    /// any other error is terminal.
    fn open_session(&mut self, session_name: &str) -> Result<(), SourceError>;

    /// Stop a stale session that holds `session_name`.
    ///
    /// # Errors
    /// Returns an error if the stale session cannot be stopped.
    fn close_existing(&mut self, _session_name: &str) -> Result<(), SourceError> {
        Ok(())
    }

    /// Enumerate the providers registered with the facility.
    ///
    /// # Errors
    /// Returns an error if enumeration fails.
    fn discover_providers(&mut self) -> Result<Vec<ProviderDesc>, SourceError>;

    /// Enable delivery of one provider's events into the session.
    ///
    /// # Errors
    /// Returns an error if the provider cannot be enabled.
    fn enable_provider(&mut self, provider: &ProviderDesc) -> Result<(), SourceError>;

    /// Ticks per second of the `timestamp` field in delivered records.
    fn tick_frequency(&self) -> u64 {
        MonotonicClock::FREQUENCY
    }

    /// Handle used to stop or flush the session from other threads.
    fn controller(&self) -> Arc<dyn SessionControl>;

    /// Deliver records to `sink` until stopped or the stream ends.
    ///
    /// Runs on the capture thread.
    ///
    /// # Errors
    /// Returns an error if processing fails; the listener queues it as a
    /// runtime error.
    fn process(&mut self, sink: &mut dyn FnMut(&RawRecord<'_>)) -> Result<(), SourceError>;
}
