//! Domain types providing compile-time safety and self-documentation

use std::fmt;

use frametrace_common::{Provider, TracePayload};

/// Registry key for an event layout: (provider, event id)
///
/// Ordered by provider first, then id, so registries iterate predictably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub provider: Provider,
    pub event_id: u16,
}

impl EventKey {
    #[must_use]
    pub const fn new(provider: Provider, event_id: u16) -> Self {
        Self { provider, event_id }
    }

    /// Key of a known payload layout
    #[must_use]
    pub const fn of<T: TracePayload>() -> Self {
        Self::new(T::PROVIDER, T::EVENT_ID)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.provider, self.event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametrace_common::{VSync, EVENT_VSYNC};

    #[test]
    fn test_event_key_display() {
        let key = EventKey::of::<VSync>();
        assert_eq!(key, EventKey::new(Provider::Sdk, EVENT_VSYNC));
        assert_eq!(key.to_string(), "Sdk#5");
    }

    #[test]
    fn test_event_key_orders_by_provider_then_id() {
        let a = EventKey::new(Provider::Sdk, 9);
        let b = EventKey::new(Provider::Unknown, 1);
        assert!(a < b);
        assert!(EventKey::new(Provider::Sdk, 1) < a);
    }
}
