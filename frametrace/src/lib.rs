//! # frametrace - Real-time Frame Event Tracing
//!
//! frametrace captures trace events emitted by a VR compositor (VSync,
//! pose latches, distortion and app timing), buffers them in a fixed-size
//! ring filled by a dedicated capture thread, and partitions the stream into
//! per-VSync analysis windows. On top of that it offers a stabilization
//! driver that waits until the compositor produces a run of consecutive,
//! on-time frames.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Platform Trace Facility                         │
//! │        (TraceSource: live session, channel, or recording)       │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ raw records (provider, id, version,
//!                         │              ticks, payload bytes)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Capture thread                                                 │
//! │   EventDecoder ──▶ OverwriteRing<Event> ──▶ WorkSignal          │
//! │   (registry)       (loss counted)           (every N events)    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ handle_events: FIFO batches of ≤192
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Consumer thread                                                │
//! │   VSyncPartitioner ──▶ VSyncWindow ──▶ FrameStabilizer          │
//! │   (3 intervals)        (v0..v3, events)  (valid-frame streak)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`event`]: the [`event::Event`] value type, the layout registry and
//!   decoder, and timestamp/typed search helpers
//! - [`ring`]: fixed-capacity overwrite ring used for the capture buffer, the
//!   partitioner's event store and its VSync pair window
//! - [`capture`]: the `TraceSource` capability and its implementations
//!   (channel-fed, recording replay, synthetic streams) plus clocks
//! - [`listener`]: [`listener::FrameListener`], which owns the session, the
//!   capture thread, the work signal and the error queue
//! - [`analysis`]: VSync partitioning and frame stabilization
//! - [`api`]: flat entry points for embedding hosts
//! - [`config`]: serde-backed listener and stabilization settings
//! - [`domain`]: error types and small shared types
//! - [`cli`]: argument parsing for the replay binary
//!
//! ## Error Model
//!
//! Nothing on the capture thread panics or returns across the thread
//! boundary. Setup failures surface from [`listener::FrameListener::start`]
//! as [`domain::ListenerError::Initialize`]; decode mismatches, processing
//! failures and ring overflow are queued (`Runtime`, `LostEvents`) and pulled
//! by the consumer.
//!
//! ## Typical Usage
//!
//! ```no_run
//! use frametrace::api;
//! use frametrace::capture::ChannelSource;
//!
//! let (source, _sender) = ChannelSource::new();
//! let stable = api::wait_for_frame_stabilization(source, 10, 1.0 / 90.0, 6000, "FrameStabilization");
//! println!("stable: {stable}");
//! ```

pub mod analysis;
pub mod api;
pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod event;
pub mod listener;
pub mod ring;
