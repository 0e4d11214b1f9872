//! Trace capture sources
//!
//! This module abstracts the platform trace facility the listener consumes:
//!
//! - [`source`] - the `TraceSource` / `SessionControl` capability traits
//! - [`clock`] - high-resolution tick clocks
//! - [`channel`] - a source fed from another thread over a channel
//! - [`recording`] - JSON recordings and the replay source
//! - [`synthetic`] - generated VSync streams

pub mod channel;
pub mod clock;
pub mod recording;
pub mod source;
pub mod synthetic;

pub use channel::{ChannelSource, RecordSender};
pub use clock::{Clock, MonotonicClock};
pub use recording::{OwnedRecord, Recording, ReplaySource};
pub use source::{ProviderDesc, RawRecord, SessionControl, TraceSource};
pub use synthetic::VSyncStream;
