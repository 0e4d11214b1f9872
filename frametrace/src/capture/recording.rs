//! Replay recordings.
//!
//! A recording is a JSON document holding the capture clock frequency and
//! the raw records in delivery order:
//!
//! ```json
//! {
//!   "tick_frequency": 1000000000,
//!   "records": [
//!     { "provider": "553787fc-d3d7-4f5e-acb2-1597c7209b3c",
//!       "event_id": 5, "version": 0, "timestamp": 11111111,
//!       "payload": [ ... ] }
//!   ]
//! }
//! ```
//!
//! [`ReplaySource`] feeds a recording through the normal capture path.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use frametrace_common::{ProviderGuid, TracePayload, SDK_PROVIDER_GUID, SDK_PROVIDER_NAME};
use serde::{Deserialize, Serialize};

use super::source::{ProviderDesc, RawRecord, SessionControl, TraceSource};
use crate::domain::{RecordingError, SourceError};

/// A raw record that owns its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedRecord {
    #[serde(with = "guid_text")]
    pub provider: ProviderGuid,
    pub event_id: u16,
    pub version: u8,
    pub timestamp: i64,
    pub payload: Vec<u8>,
}

impl OwnedRecord {
    /// Record carrying a typed payload's byte image.
    #[must_use]
    pub fn from_payload<T: TracePayload>(timestamp: i64, payload: &T) -> Self {
        Self {
            provider: T::PROVIDER.guid().unwrap_or(ProviderGuid(0)),
            event_id: T::EVENT_ID,
            version: T::VERSION,
            timestamp,
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn as_raw(&self) -> RawRecord<'_> {
        RawRecord {
            provider: self.provider,
            event_id: self.event_id,
            version: self.version,
            timestamp: self.timestamp,
            payload: &self.payload,
        }
    }
}

mod guid_text {
    use frametrace_common::ProviderGuid;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(guid: &ProviderGuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(guid)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProviderGuid, D::Error> {
        let text = String::deserialize(deserializer)?;
        ProviderGuid::parse(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid provider guid '{text}'")))
    }
}

/// Raw records plus the clock frequency they were stamped with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub tick_frequency: u64,
    pub records: Vec<OwnedRecord>,
}

impl Recording {
    #[must_use]
    pub fn new(tick_frequency: u64) -> Self {
        Self { tick_frequency, records: Vec::new() }
    }

    pub fn push(&mut self, record: OwnedRecord) {
        self.records.push(record);
    }

    /// Append a typed payload stamped with `timestamp`.
    pub fn push_payload<T: TracePayload>(&mut self, timestamp: i64, payload: &T) {
        self.push(OwnedRecord::from_payload(timestamp, payload));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load a recording from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if its
    /// tick frequency is 0.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let reader = BufReader::new(File::open(path)?);
        let recording: Self = serde_json::from_reader(reader)?;
        if recording.tick_frequency == 0 {
            return Err(RecordingError::InvalidFrequency);
        }
        Ok(recording)
    }

    /// Write the recording as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordingError> {
        if self.tick_frequency == 0 {
            return Err(RecordingError::InvalidFrequency);
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Source that replays this recording.
    #[must_use]
    pub fn into_source(self) -> ReplaySource {
        ReplaySource::new(self)
    }
}

/// Trace source that delivers a recording, then ends the stream.
pub struct ReplaySource {
    recording: Recording,
    providers: Vec<ProviderDesc>,
    control: Arc<ReplayControl>,
    stop_rx: Receiver<()>,
    speed: Option<f64>,
}

struct ReplayControl {
    stopped: AtomicBool,
    stop_tx: Sender<()>,
}

impl ReplaySource {
    #[must_use]
    pub fn new(recording: Recording) -> Self {
        let (stop_tx, stop_rx) = bounded(1);
        Self {
            recording,
            providers: vec![ProviderDesc {
                guid: SDK_PROVIDER_GUID,
                name: SDK_PROVIDER_NAME.to_string(),
            }],
            control: Arc::new(ReplayControl { stopped: AtomicBool::new(false), stop_tx }),
            stop_rx,
            speed: None,
        }
    }

    /// Pace delivery to the recorded timestamps, scaled by `speed`.
    ///
    /// `speed` of 2.0 replays twice as fast as recorded. Non-positive or
    /// non-finite values deliver as fast as possible.
    #[must_use]
    pub fn paced(mut self, speed: f64) -> Self {
        self.speed = (speed.is_finite() && speed > 0.0).then_some(speed);
        self
    }
}

impl SessionControl for ReplayControl {
    fn stop(&self) -> Result<(), SourceError> {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            let _ = self.stop_tx.try_send(());
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

impl TraceSource for ReplaySource {
    fn open_session(&mut self, _session_name: &str) -> Result<(), SourceError> {
        Ok(())
    }

    fn discover_providers(&mut self) -> Result<Vec<ProviderDesc>, SourceError> {
        Ok(self.providers.clone())
    }

    fn enable_provider(&mut self, _provider: &ProviderDesc) -> Result<(), SourceError> {
        Ok(())
    }

    fn tick_frequency(&self) -> u64 {
        self.recording.tick_frequency
    }

    fn controller(&self) -> Arc<dyn SessionControl> {
        Arc::clone(&self.control) as Arc<dyn SessionControl>
    }

    #[allow(clippy::cast_precision_loss)]
    fn process(&mut self, sink: &mut dyn FnMut(&RawRecord<'_>)) -> Result<(), SourceError> {
        let started = Instant::now();
        let first_tick = self.recording.records.first().map_or(0, |r| r.timestamp);
        let seconds_per_tick = 1.0 / self.recording.tick_frequency.max(1) as f64;

        for record in &self.recording.records {
            if self.control.stopped.load(Ordering::Acquire) {
                break;
            }
            if let Some(speed) = self.speed {
                let offset = (record.timestamp - first_tick) as f64 * seconds_per_tick / speed;
                // Offsets past Duration's range wait until stopped
                let due = Duration::try_from_secs_f64(offset.max(0.0)).unwrap_or(Duration::MAX);
                if let Some(wait) = due.checked_sub(started.elapsed()) {
                    match self.stop_rx.recv_timeout(wait) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
            }
            sink(&record.as_raw());
        }
        Ok(())
    }
}
