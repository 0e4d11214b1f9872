//! Shared capture state: the event ring, its signal and its error queue.
//!
//! The capture thread calls [`CaptureCore::on_record`] for every raw record;
//! the consumer calls [`CaptureCore::handle_events`]. Two locks:
//!
//! - `buffer` guards the ring and the since-signal counter. The producer
//!   holds it for one push; the consumer holds it only while copying a batch
//!   out.
//! - `delivery` is held by the consumer for a whole drain, so at most one
//!   drain runs at a time. The producer never takes it and therefore never
//!   waits on a user callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{error, warn};

use super::error_queue::ErrorQueue;
use super::lock_or_recover;
use super::signal::WorkSignal;
use crate::capture::RawRecord;
use crate::domain::ListenerError;
use crate::event::{Event, EventDecoder};
use crate::ring::OverwriteRing;

/// Maximum events handed to one handler call.
pub const BATCH_SIZE: usize = 192;

#[derive(Debug)]
struct BufferState {
    ring: OverwriteRing<Event>,
    since_signal: usize,
}

#[derive(Debug)]
pub struct CaptureCore {
    buffer: Mutex<BufferState>,
    delivery: Mutex<()>,
    decoder: EventDecoder,
    signal_threshold: usize,
    signal: WorkSignal,
    errors: ErrorQueue,
    terminated: AtomicBool,
}

impl CaptureCore {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(decoder: EventDecoder, capacity: usize, signal_threshold: usize) -> Self {
        Self {
            buffer: Mutex::new(BufferState {
                ring: OverwriteRing::with_capacity(capacity),
                since_signal: 0,
            }),
            delivery: Mutex::new(()),
            decoder,
            signal_threshold,
            signal: WorkSignal::new(),
            errors: ErrorQueue::new(),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn signal(&self) -> &WorkSignal {
        &self.signal
    }

    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }

    /// Decode one raw record and store it. Capture-thread entry point.
    pub fn on_record(&self, record: &RawRecord<'_>) {
        match self.decoder.decode(record) {
            Ok(Some(event)) => self.push_event(event),
            Ok(None) => {}
            Err(err) => {
                error!("Dropping event: {err}");
                self.errors.push(ListenerError::Runtime(err.to_string()));
            }
        }
    }

    /// Store a decoded event, overwriting the oldest unread one when full.
    pub fn push_event(&self, event: Event) {
        let notify = {
            let mut state = lock_or_recover(&self.buffer);
            state.ring.push(event);
            state.since_signal += 1;
            if state.since_signal > self.signal_threshold {
                state.since_signal = 0;
                true
            } else {
                false
            }
        };
        if notify {
            self.signal.notify();
        }
    }

    /// Drain every unread event, oldest first, in batches of at most
    /// [`BATCH_SIZE`]. Returns the number of events delivered.
    ///
    /// A pending overwrite count is queued as [`ListenerError::LostEvents`]
    /// before the batch that follows it is delivered.
    pub fn handle_events<F: FnMut(&[Event])>(&self, mut handler: F) -> usize {
        let _delivery = lock_or_recover(&self.delivery);
        let mut batch = [Event::default(); BATCH_SIZE];
        let mut delivered = 0;

        loop {
            let (count, lost) = {
                let mut state = lock_or_recover(&self.buffer);
                let count = state.ring.drain_into(&mut batch);
                (count, state.ring.take_lost())
            };
            if lost > 0 {
                warn!("Capture ring overflowed, lost {lost} events");
                self.errors.push(ListenerError::LostEvents(lost));
            }
            if count == 0 {
                break;
            }
            handler(&batch[..count]);
            delivered += count;
        }
        delivered
    }

    /// Unread events currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        lock_or_recover(&self.buffer).ring.len()
    }

    /// Record that the source stopped delivering and wake the consumer so
    /// it drains the tail.
    pub fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::Release);
        self.signal.notify();
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventRegistry;
    use frametrace_common::{AppConnect, TracePayload, SDK_PROVIDER_GUID};
    use std::time::Duration;

    fn core(capacity: usize, threshold: usize) -> CaptureCore {
        CaptureCore::new(EventDecoder::new(EventRegistry::sdk(), 1_000), capacity, threshold)
    }

    fn connect(pid: u64) -> Event {
        Event::from_payload(pid as f64, &AppConnect { pid })
    }

    fn pids(events: &[Event]) -> Vec<u64> {
        events.iter().map(|e| e.payload::<AppConnect>().unwrap().pid).collect()
    }

    #[test]
    fn test_drain_is_fifo_across_batches() {
        let core = core(1000, 10_000);
        for pid in 0..500 {
            core.push_event(connect(pid));
        }

        let mut seen = Vec::new();
        let mut batch_sizes = Vec::new();
        let delivered = core.handle_events(|batch| {
            batch_sizes.push(batch.len());
            seen.extend(pids(batch));
        });

        assert_eq!(delivered, 500);
        assert_eq!(batch_sizes, vec![192, 192, 116]);
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
        assert_eq!(core.buffered(), 0);
    }

    #[test]
    fn test_overflow_reports_loss_once_then_resets() {
        let capacity = 20;
        let core = core(capacity, 10_000);
        for pid in 0..(capacity as u64 + 5) {
            core.push_event(connect(pid));
        }

        let mut seen = Vec::new();
        let mut errors_before_first_batch = None;
        core.handle_events(|batch| {
            if errors_before_first_batch.is_none() {
                errors_before_first_batch = Some(core.errors().take_all());
            }
            seen.extend(pids(batch));
        });

        assert_eq!(errors_before_first_batch, Some(vec![ListenerError::LostEvents(5)]));
        // The five oldest were sacrificed
        assert_eq!(seen, (5..25).collect::<Vec<_>>());

        core.push_event(connect(99));
        core.handle_events(|_| {});
        assert!(!core.errors().has_errors());
    }

    #[test]
    fn test_signal_fires_when_threshold_exceeded() {
        let core = core(100, 3);
        for pid in 0..3 {
            core.push_event(connect(pid));
        }
        assert!(!core.signal().is_pending());
        core.push_event(connect(3));
        assert!(core.signal().wait(Some(Duration::ZERO)));

        // Counter restarted from zero
        for pid in 0..3 {
            core.push_event(connect(pid));
        }
        assert!(!core.signal().is_pending());
    }

    #[test]
    fn test_decode_failure_is_queued_as_runtime() {
        let core = core(10, 100);
        core.on_record(&RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: AppConnect::EVENT_ID,
            version: 0,
            timestamp: 0,
            payload: &[0u8; 3],
        });
        let errors = core.errors().take_all();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ListenerError::Runtime(msg) if msg.contains("size mismatch")));
        assert_eq!(core.buffered(), 0);
    }

    #[test]
    fn test_producer_not_blocked_by_running_handler() {
        use std::sync::Arc;

        let core = Arc::new(core(100, 10_000));
        core.push_event(connect(1));

        let producer = Arc::clone(&core);
        core.handle_events(|_| {
            // Runs while the delivery lock is held
            let handle = std::thread::spawn({
                let producer = Arc::clone(&producer);
                move || producer.push_event(connect(2))
            });
            handle.join().unwrap();
        });
        // The event pushed during the callback was drained by the same call
        assert_eq!(core.buffered(), 0);
    }

    #[test]
    fn test_mark_terminated_wakes_consumer() {
        let core = core(10, 100);
        assert!(!core.is_terminated());
        core.mark_terminated();
        assert!(core.is_terminated());
        assert!(core.signal().wait(Some(Duration::ZERO)));
    }
}
