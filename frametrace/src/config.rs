//! Listener and stabilization configuration
//!
//! Defaults match the values the compositor tooling has always used; a JSON
//! file may override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Default trace session name.
pub const DEFAULT_SESSION_NAME: &str = "FrameStabilization";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Platform trace session name
    pub session_name: String,
    /// Events captured between work signals
    pub signal_threshold: usize,
    /// Unread events the capture ring holds before overwriting
    pub buffer_capacity: usize,
    /// Providers whose name starts with this prefix are enabled
    pub provider_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            signal_threshold: 50,
            buffer_capacity: 1900,
            provider_prefix: "OVR-".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Default settings under a different session name.
    #[must_use]
    pub fn with_session(session_name: impl Into<String>) -> Self {
        Self { session_name: session_name.into(), ..Self::default() }
    }

    /// # Errors
    ///
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_name.is_empty() {
            return Err(ConfigError::Invalid("session_name must not be empty".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("buffer_capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Frame stabilization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Consecutive valid frames required
    pub target_frames: u32,
    /// Expected display refresh period, seconds
    pub vsync_period: f64,
    /// Overall time budget, milliseconds
    pub timeout_ms: u64,
    pub listener: ListenerConfig,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            target_frames: 10,
            vsync_period: 1.0 / 90.0,
            timeout_ms: 6000,
            listener: ListenerConfig::default(),
        }
    }
}

impl StabilizationConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds out-of-range values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_frames == 0 {
            return Err(ConfigError::Invalid("target_frames must be > 0".into()));
        }
        if !(self.vsync_period.is_finite() && self.vsync_period > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "vsync_period must be a positive number of seconds, got {}",
                self.vsync_period
            )));
        }
        self.listener.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StabilizationConfig::default();
        assert_eq!(config.target_frames, 10);
        assert_eq!(config.timeout_ms, 6000);
        assert_eq!(config.listener.session_name, "FrameStabilization");
        assert_eq!(config.listener.signal_threshold, 50);
        assert_eq!(config.listener.buffer_capacity, 1900);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_frames": 4, "listener": {{ "signal_threshold": 8 }} }}"#).unwrap();

        let config = StabilizationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target_frames, 4);
        assert_eq!(config.listener.signal_threshold, 8);
        assert_eq!(config.listener.buffer_capacity, 1900);
        assert!((config.vsync_period - 1.0 / 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = StabilizationConfig { vsync_period: 0.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let listener = ListenerConfig { buffer_capacity: 0, ..Default::default() };
        assert!(listener.validate().is_err());
    }
}
