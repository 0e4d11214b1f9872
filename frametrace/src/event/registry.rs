//! Event layout registry and raw-record decoder.
//!
//! The registry is populated once at listener construction with one
//! [`EventDescriptor`] per known payload layout. The decoder runs on the
//! capture thread for every raw record:
//!
//! 1. Unknown (provider, event id) → ignored, `Ok(None)`. A session can see
//!    events from unrelated providers; that is not an error.
//! 2. Version or size mismatch against the descriptor → `Err(DecodeError)`.
//! 3. Otherwise the payload is copied into an [`Event`] and the tick
//!    timestamp is converted to seconds.

use std::collections::HashMap;

use frametrace_common::{
    AppCompositorFocus, AppConnect, AppDisconnect, AppNoOp, DistortionBegin, DistortionEnd,
    EndFrameAppTiming, LatencyTiming, PoseLatchCpuWrite, PoseLatchGpuReadback, Provider,
    TracePayload, VSync, MAX_PAYLOAD_BYTES,
};

use super::Event;
use crate::capture::RawRecord;
use crate::domain::{DecodeError, EventKey};

/// Expected layout of one registered event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDescriptor {
    pub key: EventKey,
    pub expected_size: usize,
    pub version: u8,
}

/// (provider, event id) → layout descriptor
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    descriptors: HashMap<EventKey, EventDescriptor>,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every SDK payload layout.
    #[must_use]
    pub fn sdk() -> Self {
        let mut registry = Self::new();
        registry.register_payload::<DistortionBegin>();
        registry.register_payload::<DistortionEnd>();
        registry.register_payload::<PoseLatchCpuWrite>();
        registry.register_payload::<PoseLatchGpuReadback>();
        registry.register_payload::<VSync>();
        registry.register_payload::<AppCompositorFocus>();
        registry.register_payload::<AppConnect>();
        registry.register_payload::<AppDisconnect>();
        registry.register_payload::<AppNoOp>();
        registry.register_payload::<LatencyTiming>();
        registry.register_payload::<EndFrameAppTiming>();
        registry
    }

    /// Register a layout. Registering the same key again keeps the first entry.
    pub fn register(&mut self, provider: Provider, event_id: u16, payload_size: usize, version: u8) {
        let key = EventKey::new(provider, event_id);
        self.descriptors.entry(key).or_insert(EventDescriptor {
            key,
            expected_size: payload_size,
            version,
        });
    }

    pub fn register_payload<T: TracePayload>(&mut self) {
        self.register(T::PROVIDER, T::EVENT_ID, T::SIZE, T::VERSION);
    }

    #[must_use]
    pub fn lookup(&self, key: EventKey) -> Option<&EventDescriptor> {
        self.descriptors.get(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Converts raw trace records into [`Event`]s.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    registry: EventRegistry,
    /// Precomputed 1 / tick frequency; the hot path multiplies.
    seconds_per_tick: f64,
}

impl EventDecoder {
    /// # Panics
    ///
    /// Panics if `tick_frequency` is 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(registry: EventRegistry, tick_frequency: u64) -> Self {
        assert!(tick_frequency > 0, "tick frequency must be > 0");
        Self { registry, seconds_per_tick: 1.0 / tick_frequency as f64 }
    }

    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ticks_to_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 * self.seconds_per_tick
    }

    /// Decode one raw record.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the record's (provider, id) is
    /// registered but its version or payload size disagrees with the
    /// registered layout.
    pub fn decode(&self, record: &RawRecord<'_>) -> Result<Option<Event>, DecodeError> {
        let key = EventKey::new(record.provider.provider(), record.event_id);
        let Some(descriptor) = self.registry.lookup(key) else {
            return Ok(None);
        };

        if descriptor.version != record.version {
            return Err(DecodeError::VersionMismatch {
                key,
                expected: descriptor.version,
                actual: record.version,
            });
        }

        if descriptor.expected_size != record.payload.len() {
            return Err(DecodeError::SizeMismatch {
                key,
                expected: descriptor.expected_size,
                actual: record.payload.len(),
            });
        }

        let time = self.ticks_to_seconds(record.timestamp);
        Event::new(key.provider, key.event_id, time, record.payload)
            .map(Some)
            .ok_or(DecodeError::PayloadTooLarge {
                key,
                size: record.payload.len(),
                max: MAX_PAYLOAD_BYTES,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametrace_common::{ProviderGuid, SDK_PROVIDER_GUID};

    fn vsync_bytes(time: f64, frame: u32) -> Vec<u8> {
        VSync { vsync_time: time, frame_index: frame, tw_gpu_end_time: 0.0 }
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn test_sdk_registry_has_every_layout() {
        let registry = EventRegistry::sdk();
        assert_eq!(registry.len(), 11);
        let vsync = registry.lookup(EventKey::of::<VSync>()).unwrap();
        assert_eq!(vsync.expected_size, 20);
        assert_eq!(vsync.version, 0);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = EventRegistry::new();
        registry.register(Provider::Sdk, 5, 20, 0);
        registry.register(Provider::Sdk, 5, 99, 3);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(EventKey::new(Provider::Sdk, 5)).unwrap().expected_size, 20);
    }

    #[test]
    fn test_decode_converts_ticks_by_multiplication() {
        let decoder = EventDecoder::new(EventRegistry::sdk(), 1_000);
        let payload = vsync_bytes(2.5, 3);
        let record = RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: VSync::EVENT_ID,
            version: 0,
            timestamp: 2_500,
            payload: &payload,
        };
        let event = decoder.decode(&record).unwrap().unwrap();
        assert!((event.time - 2.5).abs() < 1e-12);
        assert_eq!({ event.payload::<VSync>().unwrap().frame_index }, 3);
    }

    #[test]
    fn test_unknown_provider_is_ignored() {
        let decoder = EventDecoder::new(EventRegistry::sdk(), 1_000);
        let payload = vsync_bytes(1.0, 1);
        let record = RawRecord {
            provider: ProviderGuid(7),
            event_id: VSync::EVENT_ID,
            version: 0,
            timestamp: 10,
            payload: &payload,
        };
        assert_eq!(decoder.decode(&record).unwrap().map(|e| e.event_id), None);
    }

    #[test]
    fn test_unknown_event_id_is_ignored() {
        let decoder = EventDecoder::new(EventRegistry::sdk(), 1_000);
        let record = RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: 999,
            version: 0,
            timestamp: 10,
            payload: &[],
        };
        assert!(decoder.decode(&record).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let decoder = EventDecoder::new(EventRegistry::sdk(), 1_000);
        let payload = vsync_bytes(1.0, 1);
        let record = RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: VSync::EVENT_ID,
            version: 2,
            timestamp: 10,
            payload: &payload,
        };
        assert!(matches!(
            decoder.decode(&record),
            Err(DecodeError::VersionMismatch { expected: 0, actual: 2, .. })
        ));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let decoder = EventDecoder::new(EventRegistry::sdk(), 1_000);
        let record = RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: VSync::EVENT_ID,
            version: 0,
            timestamp: 10,
            payload: &[0u8; 16],
        };
        assert!(matches!(
            decoder.decode(&record),
            Err(DecodeError::SizeMismatch { expected: 20, actual: 16, .. })
        ));
    }

    #[test]
    fn test_oversized_registration_rejected_at_decode() {
        let mut registry = EventRegistry::new();
        registry.register(Provider::Sdk, 50, MAX_PAYLOAD_BYTES + 4, 0);
        let decoder = EventDecoder::new(registry, 1_000);
        let payload = vec![0u8; MAX_PAYLOAD_BYTES + 4];
        let record = RawRecord {
            provider: SDK_PROVIDER_GUID,
            event_id: 50,
            version: 0,
            timestamp: 0,
            payload: &payload,
        };
        assert!(matches!(decoder.decode(&record), Err(DecodeError::PayloadTooLarge { .. })));
    }
}
