//! Domain model for frametrace
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Structured error handling shared by the listener and its callers

pub mod errors;
pub mod types;

pub use types::EventKey;

pub use errors::{ConfigError, DecodeError, ErrorCode, ListenerError, RecordingError, SourceError};
