//! Vehicle counting and lane-crossing events from per-frame tracker output.
//!
//! The crate sits behind an external detector and multi-object tracker.
//! Each frame it receives the tracker's confirmed tracks and, during the
//! first few frames, the lane detector's two boundary lines. It keeps:
//!
//! - a deduplicated count of distinct vehicles per allow-listed class
//! - per-track side-of-line membership for the two lane lines
//! - a ledger of recent side flips that expires after a window of frames
//!
//! ```rust,ignore
//! use traffic_counter::{Config, PipelineOrchestrator, TrackObservation};
//!
//! let mut pipeline = PipelineOrchestrator::new(&Config::default())?;
//! let tracks = vec![TrackObservation::new(7, "car", [600.0, 380.0, 680.0, 420.0])];
//! let snapshot = pipeline.process_frame(1, &tracks, None)?;
//! assert_eq!(snapshot.per_class_counts["car"], 1);
//! ```

pub mod config;
pub mod counting;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod replay;
pub mod types;

pub use counting::{ClassCounts, CountingOutcome, CrossingEvent, CrossingLedger, TrackRegistry};
pub use error::{ConfigError, PipelineError};
pub use geometry::{side_of_line, LaneConfig, LaneLine, LineId, LinePolarity, Side};
pub use pipeline::{FrameSnapshot, PipelineEvent, PipelineOrchestrator};
pub use types::{Config, TrackObservation};
