//! # Deserialized Trace Events
//!
//! [`Event`] is the unit that flows through the capture ring, the listener's
//! batches and the VSync partitioner. It is a plain value (no heap, no
//! borrowed data), copied into ring slots by the capture thread.
//!
//! ## Submodules
//!
//! - [`registry`] - (provider, event id) → layout descriptors and the decoder
//!   that turns raw trace records into events
//! - [`search`] - typed queries and timestamp searches over event slices

pub mod registry;
pub mod search;

use frametrace_common::{Provider, TracePayload, MAX_PAYLOAD_BYTES};

use crate::domain::EventKey;

pub use registry::{EventDecoder, EventDescriptor, EventRegistry};
pub use search::{
    events_of_type, find_event, find_exact_event, find_left_event, find_right_event,
};

/// A typed, timestamped trace event.
///
/// Validity is defined by `provider != Provider::Unknown`; default-constructed
/// slots are invalid.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    payload: [u8; MAX_PAYLOAD_BYTES],
    payload_len: u8,
    pub provider: Provider,
    pub event_id: u16,
    /// Seconds on the capture clock
    pub time: f64,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            payload: [0; MAX_PAYLOAD_BYTES],
            payload_len: 0,
            provider: Provider::Unknown,
            event_id: 0,
            time: 0.0,
        }
    }
}

impl Event {
    /// Build an event from a payload byte image.
    ///
    /// Returns `None` if `payload` does not fit in an event slot.
    #[must_use]
    pub fn new(provider: Provider, event_id: u16, time: f64, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return None;
        }
        let mut event = Self { provider, event_id, time, ..Self::default() };
        event.payload[..payload.len()].copy_from_slice(payload);
        #[allow(clippy::cast_possible_truncation)] // bounded by MAX_PAYLOAD_BYTES
        {
            event.payload_len = payload.len() as u8;
        }
        Some(event)
    }

    /// Build an event from a typed payload.
    #[must_use]
    pub fn from_payload<T: TracePayload>(time: f64, payload: &T) -> Self {
        let mut event = Self {
            provider: T::PROVIDER,
            event_id: T::EVENT_ID,
            time,
            ..Self::default()
        };
        let bytes = payload.as_bytes();
        event.payload[..bytes.len()].copy_from_slice(bytes);
        #[allow(clippy::cast_possible_truncation)]
        {
            event.payload_len = bytes.len() as u8;
        }
        event
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.provider != Provider::Unknown
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> EventKey {
        EventKey::new(self.provider, self.event_id)
    }

    /// Raw payload bytes.
    #[inline]
    #[must_use]
    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload[..usize::from(self.payload_len)]
    }

    /// Whether this event carries payload layout `T`.
    #[inline]
    #[must_use]
    pub fn is<T: TracePayload>(&self) -> bool {
        self.provider == T::PROVIDER && self.event_id == T::EVENT_ID
    }

    /// Typed view of the payload.
    ///
    /// Returns `None` if the event is not of type `T` or its payload size
    /// does not match `T`'s layout.
    #[must_use]
    pub fn payload<T: TracePayload>(&self) -> Option<T> {
        if !self.is::<T>() || usize::from(self.payload_len) != T::SIZE {
            return None;
        }
        // SAFETY: T is packed POD (TracePayload contract) and we verified
        // that exactly size_of::<T>() initialized bytes are present.
        #[allow(unsafe_code)]
        let value = unsafe { std::ptr::read_unaligned(self.payload.as_ptr().cast::<T>()) };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametrace_common::{AppConnect, VSync};

    #[test]
    fn test_default_event_is_invalid() {
        let event = Event::default();
        assert!(!event.is_valid());
        assert!(event.payload_bytes().is_empty());
    }

    #[test]
    fn test_typed_payload_access() {
        let vsync = VSync { vsync_time: 2.25, frame_index: 41, tw_gpu_end_time: 2.2 };
        let event = Event::from_payload(2.25, &vsync);

        assert!(event.is_valid());
        assert!(event.is::<VSync>());
        assert!(!event.is::<AppConnect>());

        let decoded = event.payload::<VSync>().unwrap();
        assert_eq!({ decoded.frame_index }, 41);
        assert_eq!({ decoded.vsync_time }, 2.25);
        assert!(event.payload::<AppConnect>().is_none());
    }

    #[test]
    fn test_payload_rejects_size_mismatch() {
        let event = Event::new(Provider::Sdk, VSync::EVENT_ID, 1.0, &[0u8; 12]).unwrap();
        assert!(event.is::<VSync>());
        assert!(event.payload::<VSync>().is_none());
    }

    #[test]
    fn test_new_rejects_oversized_payload() {
        assert!(Event::new(Provider::Sdk, 1, 0.0, &[0u8; MAX_PAYLOAD_BYTES + 1]).is_none());
        assert!(Event::new(Provider::Sdk, 1, 0.0, &[0u8; MAX_PAYLOAD_BYTES]).is_some());
    }
}
