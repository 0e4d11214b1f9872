//! Channel-fed trace source.
//!
//! [`ChannelSource`] behaves like a platform trace session whose records
//! arrive from a [`RecordSender`] on another thread. It runs the real
//! capture path (capture thread, decoder, ring) so tests and tools can
//! replay synthetic or recorded streams without OS tracing.
//!
//! The stream ends when every `RecordSender` is dropped; `process` then
//! returns as if the facility had finished delivering.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use frametrace_common::{TracePayload, SDK_PROVIDER_GUID, SDK_PROVIDER_NAME};
use log::debug;

use super::clock::{Clock, MonotonicClock};
use super::recording::OwnedRecord;
use super::source::{ProviderDesc, RawRecord, SessionControl, TraceSource};
use crate::domain::SourceError;

/// Failures to inject into the session lifecycle.
#[derive(Debug, Default, Clone)]
struct FailurePlan {
    open: Option<String>,
    stale_session: bool,
    discovery: Option<String>,
    enable: Vec<String>,
    process: Option<String>,
}

/// Trace source fed through a crossbeam channel.
pub struct ChannelSource {
    providers: Vec<ProviderDesc>,
    records: Receiver<OwnedRecord>,
    stop_rx: Receiver<()>,
    control: Arc<ChannelControl>,
    failures: FailurePlan,
    session: Option<String>,
    enabled: Vec<ProviderDesc>,
    tick_frequency: u64,
}

/// Producer half of a [`ChannelSource`].
#[derive(Clone)]
pub struct RecordSender {
    tx: Sender<OwnedRecord>,
}

struct ChannelControl {
    stop_tx: Sender<()>,
    stopped: AtomicBool,
    flushes: AtomicUsize,
    fail_stop: AtomicBool,
}

impl ChannelSource {
    /// Source advertising the SDK provider, plus its sender.
    #[must_use]
    pub fn new() -> (Self, RecordSender) {
        let (tx, records) = unbounded();
        let (stop_tx, stop_rx) = bounded(1);
        let source = Self {
            providers: vec![ProviderDesc {
                guid: SDK_PROVIDER_GUID,
                name: SDK_PROVIDER_NAME.to_string(),
            }],
            records,
            stop_rx,
            control: Arc::new(ChannelControl {
                stop_tx,
                stopped: AtomicBool::new(false),
                flushes: AtomicUsize::new(0),
                fail_stop: AtomicBool::new(false),
            }),
            failures: FailurePlan::default(),
            session: None,
            enabled: Vec::new(),
            tick_frequency: MonotonicClock::FREQUENCY,
        };
        (source, RecordSender { tx })
    }

    /// Replace the advertised provider list.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<ProviderDesc>) -> Self {
        self.providers = providers;
        self
    }

    /// Ticks per second of the timestamps the sender will use.
    #[must_use]
    pub fn with_tick_frequency(mut self, tick_frequency: u64) -> Self {
        self.tick_frequency = tick_frequency;
        self
    }

    /// Make `open_session` fail with `reason`.
    #[must_use]
    pub fn fail_open(mut self, reason: impl Into<String>) -> Self {
        self.failures.open = Some(reason.into());
        self
    }

    /// Pretend a session with the same name is already running.
    #[must_use]
    pub fn with_stale_session(mut self) -> Self {
        self.failures.stale_session = true;
        self
    }

    /// Make `discover_providers` fail with `reason`.
    #[must_use]
    pub fn fail_discovery(mut self, reason: impl Into<String>) -> Self {
        self.failures.discovery = Some(reason.into());
        self
    }

    /// Make enabling the provider called `name` fail.
    #[must_use]
    pub fn fail_enable(mut self, name: impl Into<String>) -> Self {
        self.failures.enable.push(name.into());
        self
    }

    /// Make `process` report `reason` once the stream ends.
    #[must_use]
    pub fn fail_process(mut self, reason: impl Into<String>) -> Self {
        self.failures.process = Some(reason.into());
        self
    }

    /// Make `SessionControl::stop` fail.
    #[must_use]
    pub fn fail_stop(self) -> Self {
        self.control.fail_stop.store(true, Ordering::Relaxed);
        self
    }

    /// Providers enabled so far.
    #[must_use]
    pub fn enabled_providers(&self) -> &[ProviderDesc] {
        &self.enabled
    }

    /// Name of the open session, if any.
    #[must_use]
    pub fn session_name(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Number of successful flush requests.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.control.flushes.load(Ordering::Relaxed)
    }
}

impl RecordSender {
    /// Queue a record. Returns `false` if the source is gone.
    pub fn send(&self, record: OwnedRecord) -> bool {
        self.tx.send(record).is_ok()
    }

    /// Queue a typed payload stamped with `ticks`.
    pub fn send_payload<T: TracePayload>(&self, ticks: i64, payload: &T) -> bool {
        self.send(OwnedRecord::from_payload(ticks, payload))
    }

    /// Queue a typed payload stamped with the current monotonic time.
    pub fn send_now<T: TracePayload>(&self, payload: &T) -> bool {
        self.send_payload(MonotonicClock.now_ticks(), payload)
    }
}

impl SessionControl for ChannelControl {
    fn stop(&self) -> Result<(), SourceError> {
        if self.fail_stop.load(Ordering::Relaxed) {
            return Err(SourceError::ControlFailed("stop refused".to_string()));
        }
        if !self.stopped.swap(true, Ordering::AcqRel) {
            let _ = self.stop_tx.try_send(());
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SourceError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SourceError::ControlFailed("session stopped".to_string()));
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl TraceSource for ChannelSource {
    fn open_session(&mut self, session_name: &str) -> Result<(), SourceError> {
        if let Some(reason) = &self.failures.open {
            return Err(SourceError::OpenFailed {
                session: session_name.to_string(),
                reason: reason.clone(),
            });
        }
        if self.failures.stale_session {
            return Err(SourceError::AlreadyExists(session_name.to_string()));
        }
        self.session = Some(session_name.to_string());
        Ok(())
    }

    fn close_existing(&mut self, session_name: &str) -> Result<(), SourceError> {
        debug!("Closing stale session '{session_name}'");
        self.failures.stale_session = false;
        Ok(())
    }

    fn discover_providers(&mut self) -> Result<Vec<ProviderDesc>, SourceError> {
        match &self.failures.discovery {
            Some(reason) => Err(SourceError::DiscoveryFailed(reason.clone())),
            None => Ok(self.providers.clone()),
        }
    }

    fn enable_provider(&mut self, provider: &ProviderDesc) -> Result<(), SourceError> {
        if self.failures.enable.iter().any(|name| *name == provider.name) {
            return Err(SourceError::EnableFailed {
                provider: provider.name.clone(),
                reason: "access denied".to_string(),
            });
        }
        self.enabled.push(provider.clone());
        Ok(())
    }

    fn tick_frequency(&self) -> u64 {
        self.tick_frequency
    }

    fn controller(&self) -> Arc<dyn SessionControl> {
        Arc::clone(&self.control) as Arc<dyn SessionControl>
    }

    fn process(&mut self, sink: &mut dyn FnMut(&RawRecord<'_>)) -> Result<(), SourceError> {
        loop {
            select! {
                recv(self.records) -> msg => match msg {
                    Ok(record) => sink(&record.as_raw()),
                    // Every sender dropped: end of stream
                    Err(_) => break,
                },
                recv(self.stop_rx) -> _ => return Ok(()),
            }
        }
        match &self.failures.process {
            Some(reason) => Err(SourceError::ProcessFailed(reason.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametrace_common::{AppConnect, ProviderGuid};

    #[test]
    fn test_process_delivers_until_senders_drop() {
        let (mut source, sender) = ChannelSource::new();
        source.open_session("test").unwrap();
        assert_eq!(source.session_name(), Some("test"));
        assert!(sender.send_payload(10, &AppConnect { pid: 1 }));
        assert!(sender.send_payload(20, &AppConnect { pid: 2 }));
        drop(sender);

        let mut seen = Vec::new();
        source.process(&mut |record| seen.push(record.timestamp)).unwrap();
        assert_eq!(seen, vec![10, 20]);
    }

    #[test]
    fn test_stop_unblocks_process() {
        let (mut source, _sender) = ChannelSource::new();
        let control = source.controller();
        control.flush().unwrap();
        assert_eq!(source.flush_count(), 1);
        let handle = std::thread::spawn(move || source.process(&mut |_| {}));
        control.stop().unwrap();
        assert!(handle.join().unwrap().is_ok());
        assert!(control.flush().is_err());
    }

    #[test]
    fn test_stale_session_cleared_by_close_existing() {
        let (source, _sender) = ChannelSource::new();
        let mut source = source.with_stale_session();
        assert!(matches!(source.open_session("s"), Err(SourceError::AlreadyExists(_))));
        source.close_existing("s").unwrap();
        assert!(source.open_session("s").is_ok());
    }

    #[test]
    fn test_enable_failure_is_per_provider() {
        let (source, _sender) = ChannelSource::new();
        let mut source = source
            .with_providers(vec![
                ProviderDesc { guid: ProviderGuid(1), name: "OVR-A".into() },
                ProviderDesc { guid: ProviderGuid(2), name: "OVR-B".into() },
            ])
            .fail_enable("OVR-A");
        let providers = source.discover_providers().unwrap();
        assert!(source.enable_provider(&providers[0]).is_err());
        assert!(source.enable_provider(&providers[1]).is_ok());
        assert_eq!(source.enabled_providers().len(), 1);
    }
}
