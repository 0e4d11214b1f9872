//! Command-line interface for the replay binary

mod args;

pub use args::Args;

use crate::config::StabilizationConfig;
use crate::domain::ConfigError;

impl Args {
    /// Stabilization settings: defaults, then `--config`, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the merged
    /// settings are out of range.
    pub fn stabilization_config(&self) -> Result<StabilizationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => StabilizationConfig::from_file(path)?,
            None => StabilizationConfig::default(),
        };
        if let Some(frames) = self.target_frames {
            config.target_frames = frames;
        }
        if let Some(hz) = self.refresh_rate {
            if !(hz.is_finite() && hz > 0.0) {
                return Err(ConfigError::Invalid(format!("refresh rate must be positive, got {hz}")));
            }
            config.vsync_period = 1.0 / hz;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(threshold) = self.signal_threshold {
            config.listener.signal_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}
