// src/pipeline/mod.rs

pub mod event_bus;
pub mod lane_calibration;
pub mod metrics;
pub mod orchestrator;

pub use event_bus::{EventBus, PipelineEvent};
pub use lane_calibration::{CalibrationState, LaneCalibration};
pub use metrics::{MetricsSummary, PipelineMetrics};
pub use orchestrator::{FinalReport, FlipRecord, FrameSnapshot, PipelineOrchestrator};
