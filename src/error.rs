// src/error.rs

use thiserror::Error;

/// Invalid pipeline configuration, detected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("allow-list is empty: at least one class must be countable")]
    EmptyAllowList,

    #[error("crossing window is zero: set crossing.window_frames or a non-zero video.fps")]
    ZeroCrossingWindow,

    #[error("lane detection is enabled but lanes.warmup_frames is 0")]
    ZeroLaneWarmup,
}

/// Caller contract violations. Per-item anomalies never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("frame {got} delivered after frame {last}: frames must be strictly increasing")]
    OutOfOrderFrame { last: u64, got: u64 },
}
