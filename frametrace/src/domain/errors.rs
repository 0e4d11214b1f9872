//! Structured error types for frametrace
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

use super::types::EventKey;

/// Stable numeric codes for queued listener errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Initialize,
    Runtime,
    LostEvents,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            ErrorCode::Initialize => -91001,
            ErrorCode::Runtime => -91002,
            ErrorCode::LostEvents => -91003,
        }
    }
}

/// Error record accumulated by a listener and pulled by the consumer.
///
/// Producer-side failures are never raised across the capture thread; they
/// are queued as one of these and drained with `get_and_clear_errors`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Session or provider setup failed; the listener instance is unusable.
    #[error("Listener initialization failed: {0}")]
    Initialize(String),

    /// Processing failure; capture continues.
    #[error("Listener runtime error: {0}")]
    Runtime(String),

    /// Unread events were overwritten in the capture ring.
    #[error("Lost {0} events")]
    LostEvents(u64),
}

impl ListenerError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            ListenerError::Initialize(_) => ErrorCode::Initialize,
            ListenerError::Runtime(_) => ErrorCode::Runtime,
            ListenerError::LostEvents(_) => ErrorCode::LostEvents,
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Failures reported by a trace source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Trace session '{0}' already exists")]
    AlreadyExists(String),

    #[error("Failed to open trace session '{session}': {reason}")]
    OpenFailed { session: String, reason: String },

    #[error("Failed to enumerate providers: {0}")]
    DiscoveryFailed(String),

    #[error("Failed to enable provider {provider}: {reason}")]
    EnableFailed { provider: String, reason: String },

    #[error("Trace processing failed: {0}")]
    ProcessFailed(String),

    #[error("Session control failed: {0}")]
    ControlFailed(String),
}

/// Why a raw record for a registered layout was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Mismatched payload version for {key}: expected {expected}, got {actual}")]
    VersionMismatch { key: EventKey, expected: u8, actual: u8 },

    #[error("Payload size mismatch for {key}: expected {expected} bytes, got {actual}")]
    SizeMismatch { key: EventKey, expected: usize, actual: usize },

    #[error("Payload for {key} is {size} bytes, larger than the {max} byte event slot")]
    PayloadTooLarge { key: EventKey, size: usize, max: usize },
}

/// Failures loading or saving a replay recording.
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording has zero tick frequency")]
    InvalidFrequency,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
