// src/config.rs

use crate::error::ConfigError;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counting.allowed_classes.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        if self.crossing_window() == 0 {
            return Err(ConfigError::ZeroCrossingWindow);
        }
        if self.lanes.enabled && self.lanes.warmup_frames == 0 {
            return Err(ConfigError::ZeroLaneWarmup);
        }
        Ok(())
    }

    /// Crossing expiry window in frames.
    pub fn crossing_window(&self) -> u64 {
        self.crossing
            .window_frames
            .unwrap_or(u64::from(self.video.fps))
    }
}
