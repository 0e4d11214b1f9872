//! # Frame Event Listener
//!
//! [`FrameListener`] owns a trace session, the capture thread that runs the
//! source's processing loop, and the ring the capture thread fills.
//!
//! ```text
//!  TraceSource::process ──▶ EventDecoder ──▶ OverwriteRing<Event>
//!     (capture thread)                          │  every N events
//!                                               ▼
//!                              WorkSignal ──▶ consumer: wait / handle_events
//! ```
//!
//! Producer-side failures (decode mismatches, processing errors, ring
//! overflow) never cross the thread boundary as panics or results; they are
//! queued and pulled with [`FrameListener::get_and_clear_errors`].
//!
//! Only one consumer thread may drain a listener at a time.

mod core;
mod error_queue;
mod signal;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::capture::{ProviderDesc, SessionControl, TraceSource};
use crate::config::ListenerConfig;
use crate::domain::{ListenerError, SourceError};
use crate::event::{Event, EventDecoder, EventRegistry};

pub use self::core::BATCH_SIZE;
use self::core::CaptureCore;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// The capture thread must never panic on a poisoned lock.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running trace session plus its capture thread.
pub struct FrameListener {
    core: Arc<CaptureCore>,
    control: Arc<dyn SessionControl>,
    capture_thread: Option<JoinHandle<()>>,
    session_name: String,
}

impl FrameListener {
    /// Open the session, enable matching providers and start capturing.
    ///
    /// Individual provider enable failures are queued as runtime errors and
    /// do not abort the session.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Initialize`] if the configuration is invalid,
    /// the session cannot be opened (after one retry when a stale session
    /// holds the name), providers cannot be enumerated, or the capture
    /// thread cannot be spawned.
    pub fn start<S: TraceSource>(mut source: S, config: &ListenerConfig) -> Result<Self, ListenerError> {
        config
            .validate()
            .map_err(|err| ListenerError::Initialize(err.to_string()))?;
        let tick_frequency = source.tick_frequency();
        if tick_frequency == 0 {
            return Err(ListenerError::Initialize("trace clock frequency is 0".into()));
        }

        open_session(&mut source, &config.session_name)?;
        let control = source.controller();

        let providers = match source.discover_providers() {
            Ok(providers) => providers,
            Err(err) => {
                stop_after_failed_start(control.as_ref(), &config.session_name);
                return Err(ListenerError::Initialize(err.to_string()));
            }
        };

        let decoder = EventDecoder::new(EventRegistry::sdk(), tick_frequency);
        let core = Arc::new(CaptureCore::new(
            decoder,
            config.buffer_capacity,
            config.signal_threshold,
        ));

        let wanted: Vec<&ProviderDesc> = providers
            .iter()
            .filter(|p| matches_prefix(&p.name, &config.provider_prefix))
            .collect();
        if wanted.is_empty() {
            warn!(
                "No providers matching '{}' found for session '{}'",
                config.provider_prefix, config.session_name
            );
        }
        for provider in wanted {
            match source.enable_provider(provider) {
                Ok(()) => debug!("Enabled provider {} ({})", provider.name, provider.guid),
                Err(err) => {
                    warn!("{err}");
                    core.errors().push(ListenerError::Runtime(err.to_string()));
                }
            }
        }

        let capture_thread =
            match spawn_capture_thread(source, Arc::clone(&core), &config.session_name) {
                Ok(handle) => handle,
                Err(err) => {
                    stop_after_failed_start(control.as_ref(), &config.session_name);
                    return Err(err);
                }
            };

        info!("Trace session '{}' started", config.session_name);
        Ok(Self {
            core,
            control,
            capture_thread: Some(capture_thread),
            session_name: config.session_name.clone(),
        })
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Block until the capture thread signals work or `timeout` elapses
    /// (`None` waits indefinitely).
    ///
    /// The signal is edge-triggered: the pending flag is cleared on return,
    /// so a caller that wakes must drain with [`Self::handle_events`].
    pub fn wait_until_work_available(&self, timeout: Option<Duration>) -> bool {
        self.core.signal().wait(timeout)
    }

    /// Mark work as available and wake one waiter.
    pub fn signal_work(&self) {
        self.core.signal().notify();
    }

    /// Deliver every buffered event to `handler`, oldest first, in batches
    /// of at most [`BATCH_SIZE`]. Returns the number delivered.
    ///
    /// Lost-event counts are queued as [`ListenerError::LostEvents`] ahead of
    /// the batch that follows the loss.
    pub fn handle_events<F: FnMut(&[Event])>(&self, handler: F) -> usize {
        self.core.handle_events(handler)
    }

    /// Ask the trace facility to flush its buffers.
    pub fn flush(&self) -> bool {
        match self.control.flush() {
            Ok(()) => true,
            Err(err) => {
                debug!("Flush of '{}' failed: {err}", self.session_name);
                false
            }
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.core.errors().has_errors()
    }

    /// Take every queued error in the order it was raised.
    #[must_use]
    pub fn get_and_clear_errors(&self) -> Vec<ListenerError> {
        self.core.errors().take_all()
    }

    /// Whether the source's processing loop has returned.
    #[must_use]
    pub fn capture_terminated(&self) -> bool {
        self.core.is_terminated()
    }

    /// Unread events currently in the ring.
    #[must_use]
    pub fn buffered_events(&self) -> usize {
        self.core.buffered()
    }
}

impl Drop for FrameListener {
    fn drop(&mut self) {
        match self.control.stop() {
            Ok(()) => {
                if let Some(handle) = self.capture_thread.take() {
                    if handle.join().is_err() {
                        warn!("Capture thread for '{}' panicked", self.session_name);
                    }
                }
                info!("Trace session '{}' stopped", self.session_name);
            }
            Err(err) => {
                // The processing loop may still be blocked; detach rather than hang
                warn!(
                    "Failed to stop trace session '{}': {err}; detaching capture thread",
                    self.session_name
                );
                self.capture_thread.take();
            }
        }
    }
}

/// Stop a session that opened but never got a capture thread.
fn stop_after_failed_start(control: &dyn SessionControl, session_name: &str) {
    if let Err(err) = control.stop() {
        warn!("Failed to stop trace session '{session_name}' after failed start: {err}");
    }
}

fn matches_prefix(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

/// Open `session_name`, stopping a stale session of the same name and
/// retrying once.
fn open_session<S: TraceSource>(source: &mut S, session_name: &str) -> Result<(), ListenerError> {
    let first = match source.open_session(session_name) {
        Err(SourceError::AlreadyExists(_)) => {
            warn!("Trace session '{session_name}' already exists, stopping it");
            if let Err(err) = source.close_existing(session_name) {
                debug!("Stopping stale session failed: {err}");
            }
            source.open_session(session_name)
        }
        other => other,
    };
    first.map_err(|err| {
        error!("Failed to start tracing: {err}");
        ListenerError::Initialize(format!("Failed to start tracing: {err}"))
    })
}

fn spawn_capture_thread<S: TraceSource>(
    mut source: S,
    core: Arc<CaptureCore>,
    session_name: &str,
) -> Result<JoinHandle<()>, ListenerError> {
    std::thread::Builder::new()
        .name(format!("capture-{session_name}"))
        .spawn(move || {
            let result = source.process(&mut |record| core.on_record(record));
            if let Err(err) = result {
                error!("{err}");
                core.errors()
                    .push(ListenerError::Runtime(format!("process trace failed: {err}")));
            }
            core.mark_terminated();
        })
        .map_err(|err| ListenerError::Initialize(format!("failed to spawn capture thread: {err}")))
}
