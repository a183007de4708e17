// src/types.rs

use serde::{Deserialize, Serialize};

use crate::geometry::LinePolarity;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub counting: CountingConfig,
    pub lanes: LaneConfigSection,
    pub crossing: CrossingConfig,
    pub tracking: TrackingConfig,
    pub video: VideoConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingConfig {
    /// Class names eligible for counting, in display order
    pub allowed_classes: Vec<String>,
}

impl Default for CountingConfig {
    fn default() -> Self {
        Self {
            allowed_classes: vec!["car".to_string(), "bus".to_string(), "truck".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfigSection {
    pub enabled: bool,
    /// Lane geometry is accepted for the first `warmup_frames` frames processed, then frozen
    pub warmup_frames: u64,
    pub left_polarity: LinePolarity,
    pub right_polarity: LinePolarity,
}

impl Default for LaneConfigSection {
    fn default() -> Self {
        Self {
            enabled: false,
            warmup_frames: 4,
            left_polarity: LinePolarity::AboveIsSet,
            right_polarity: LinePolarity::AboveIsClear,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    /// Expiry window in frames. Falls back to `video.fps` (about one second).
    pub window_frames: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Tracks that missed more updates than this are skipped for the frame
    pub max_frames_since_update: u32,
    /// Drop lane memberships not observed for this many frames. Disabled when unset.
    pub membership_horizon_frames: Option<u64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_frames_since_update: 1,
            membership_horizon_frames: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame rate reported by the video source
    pub fps: u32,
    pub replay_path: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            replay_path: "data/tracks.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub show_counts: bool,
    pub show_track_info: bool,
    pub emit_json: bool,
    /// Pending pipeline events kept for `drain_events`; 0 disables the queue
    pub event_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_counts: false,
            show_track_info: false,
            emit_json: false,
            event_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A track as reported by the external multi-object tracker for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackObservation {
    pub id: u64,
    pub class_name: String,
    pub bbox: [f32; 4], // [xmin, ymin, xmax, ymax] pixels
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    #[serde(default)]
    pub frames_since_update: u32,
}

fn default_confirmed() -> bool {
    true
}

impl TrackObservation {
    pub fn new(id: u64, class_name: &str, bbox: [f32; 4]) -> Self {
        Self {
            id,
            class_name: class_name.to_string(),
            bbox,
            confirmed: true,
            frames_since_update: 0,
        }
    }

    /// Confirmed and updated recently enough to be trusted this frame.
    pub fn is_reportable(&self, max_frames_since_update: u32) -> bool {
        self.confirmed && self.frames_since_update <= max_frames_since_update
    }
}
