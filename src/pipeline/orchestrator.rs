// src/pipeline/orchestrator.rs
//
// Per-frame sequencing of the counting pipeline.
//
// Signal flow for one frame:
//   lane detector result → lane_calibration (warm-up only)
//   tracker output       → filter (confirmed, fresh) → registry.observe
//   registry flips       → crossing ledger.record_flip
//   end of frame         → ledger expiry → membership eviction → snapshot
//
// Frames must arrive in strictly increasing order: flip detection compares
// against the most recently observed side.

use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::event_bus::{EventBus, PipelineEvent};
use super::lane_calibration::{CalibrationState, LaneCalibration};
use super::metrics::{MetricsSummary, PipelineMetrics};
use crate::counting::{CountingOutcome, CrossingEvent, CrossingLedger, TrackId, TrackRegistry};
use crate::error::{ConfigError, PipelineError};
use crate::geometry::{LaneConfig, LineId, Side};
use crate::types::{Config, TrackObservation};

/// One side flip observed during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlipRecord {
    pub track_id: TrackId,
    pub line: LineId,
    pub side: Side,
}

/// State handed to the presentation layer after each frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub frame_number: u64,
    /// Counts in allow-list order
    pub per_class_counts: IndexMap<String, u64>,
    pub total_distinct_tracks: usize,
    /// Reportable tracks in this frame
    pub tracks_in_frame: usize,
    pub active_crossing: bool,
    pub active_crossings: usize,
    pub flips: Vec<FlipRecord>,
}

impl FrameSnapshot {
    pub fn crossing_status(&self) -> &'static str {
        if self.active_crossing {
            "Lane crossing occurring!"
        } else {
            "Lane crossing not occurred"
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub last_frame: Option<u64>,
    pub per_class_counts: IndexMap<String, u64>,
    pub total_distinct_tracks: usize,
    pub lane_memberships: usize,
    pub active_crossings: Vec<CrossingEvent>,
    pub events_dropped: u64,
    pub metrics: MetricsSummary,
}

pub struct PipelineOrchestrator {
    max_frames_since_update: u32,
    crossing_window: u64,
    membership_horizon: Option<u64>,
    show_track_info: bool,

    registry: TrackRegistry,
    ledger: CrossingLedger,
    calibration: LaneCalibration,
    events: EventBus,
    metrics: PipelineMetrics,
    last_frame: Option<u64>,
}

impl PipelineOrchestrator {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let crossing_window = config.crossing_window();

        info!(
            "Pipeline ready: classes [{}], lanes {}, crossing window {} frames",
            config.counting.allowed_classes.join(", "),
            if config.lanes.enabled { "on" } else { "off" },
            crossing_window
        );

        Ok(Self {
            max_frames_since_update: config.tracking.max_frames_since_update,
            crossing_window,
            membership_horizon: config.tracking.membership_horizon_frames,
            show_track_info: config.output.show_track_info,
            registry: TrackRegistry::new(
                &config.counting.allowed_classes,
                config.lanes.left_polarity,
                config.lanes.right_polarity,
            ),
            ledger: CrossingLedger::new(),
            calibration: LaneCalibration::new(config.lanes.enabled, config.lanes.warmup_frames),
            events: EventBus::new(config.output.event_capacity),
            metrics: PipelineMetrics::new(),
            last_frame: None,
        })
    }

    /// Process one frame of tracker output. `lanes` is the lane detector's
    /// result for this frame, if it ran; it is only used during warm-up.
    pub fn process_frame(
        &mut self,
        frame_number: u64,
        tracks: &[TrackObservation],
        lanes: Option<LaneConfig>,
    ) -> Result<FrameSnapshot, PipelineError> {
        if let Some(last) = self.last_frame {
            if frame_number <= last {
                self.metrics.inc(&self.metrics.rejected_frames);
                warn!("Rejected frame {} (last processed {})", frame_number, last);
                return Err(PipelineError::OutOfOrderFrame {
                    last,
                    got: frame_number,
                });
            }
        }
        let started = Instant::now();

        if self.calibration.update(frame_number, lanes) {
            if let Some(lanes) = self.calibration.lanes() {
                self.events.publish(PipelineEvent::LanesCalibrated {
                    frame: frame_number,
                    lanes: *lanes,
                });
            }
        }
        let lanes = self.calibration.lanes().copied();
        if lanes.is_some() {
            self.metrics.inc(&self.metrics.frames_with_lanes);
        }

        let mut flips = Vec::new();
        let mut tracks_in_frame = 0;
        for track in tracks {
            if !track.is_reportable(self.max_frames_since_update) {
                self.metrics.inc(&self.metrics.tracks_skipped);
                continue;
            }
            tracks_in_frame += 1;
            self.metrics.inc(&self.metrics.tracks_observed);
            self.observe_track(frame_number, track, lanes.as_ref(), &mut flips);
        }

        for expired in self.ledger.drain_expired(frame_number, self.crossing_window) {
            debug!(
                "Crossing for track {} expired (last flip at frame {})",
                expired.track_id, expired.last_frame
            );
            self.metrics.inc(&self.metrics.crossings_expired);
            self.events.publish(PipelineEvent::CrossingExpired {
                frame: frame_number,
                track_id: expired.track_id,
                last_frame: expired.last_frame,
            });
        }

        if let Some(horizon) = self.membership_horizon {
            let evicted = self.registry.evict_stale(frame_number, horizon);
            if evicted > 0 {
                debug!(
                    "Evicted {} stale lane memberships ({} remain)",
                    evicted,
                    self.registry.membership_count()
                );
                self.metrics.add(&self.metrics.memberships_evicted, evicted as u64);
            }
        }

        self.last_frame = Some(frame_number);
        self.metrics.inc(&self.metrics.total_frames);
        self.metrics.set_timing(
            &self.metrics.frame_time_us,
            started.elapsed().as_micros() as u64,
        );

        let mut snapshot = self.snapshot();
        snapshot.tracks_in_frame = tracks_in_frame;
        snapshot.flips = flips;
        Ok(snapshot)
    }

    fn observe_track(
        &mut self,
        frame_number: u64,
        track: &TrackObservation,
        lanes: Option<&LaneConfig>,
        flips: &mut Vec<FlipRecord>,
    ) {
        if self.show_track_info {
            info!(
                "Tracker ID: {}, Class: {}, BBox Coords (xmin, ymin, xmax, ymax): ({}, {}, {}, {})",
                track.id,
                track.class_name,
                track.bbox[0] as i32,
                track.bbox[1] as i32,
                track.bbox[2] as i32,
                track.bbox[3] as i32
            );
        }

        let outcome =
            self.registry
                .observe(track.id, &track.class_name, &track.bbox, lanes, frame_number);

        match outcome {
            CountingOutcome::Ignored => {
                self.metrics.inc(&self.metrics.ignored_observations);
            }
            CountingOutcome::NewlyCounted => {
                let class_total = self.registry.counts().get(&track.class_name);
                info!(
                    "Counted {} #{} (track {}) at frame {}",
                    track.class_name, class_total, track.id, frame_number
                );
                self.metrics.inc(&self.metrics.vehicles_counted);
                self.events.publish(PipelineEvent::VehicleCounted {
                    frame: frame_number,
                    track_id: track.id,
                    class_name: track.class_name.clone(),
                    class_total,
                });
            }
            CountingOutcome::Tracked { flips: line_flips } => {
                for flip in line_flips {
                    debug!(
                        "Track {} moved {} the {} line at frame {}",
                        track.id,
                        flip.side.as_str(),
                        flip.line.as_str(),
                        frame_number
                    );
                    self.metrics.inc(&self.metrics.line_flips);
                    self.events.publish(PipelineEvent::LineFlipped {
                        frame: frame_number,
                        track_id: track.id,
                        line: flip.line,
                        side: flip.side,
                    });
                    flips.push(FlipRecord {
                        track_id: track.id,
                        line: flip.line,
                        side: flip.side,
                    });

                    if self.ledger.record_flip(track.id, frame_number) {
                        info!("Lane crossing: track {} at frame {}", track.id, frame_number);
                        self.metrics.inc(&self.metrics.crossings_started);
                        self.events.publish(PipelineEvent::CrossingStarted {
                            frame: frame_number,
                            track_id: track.id,
                        });
                    }
                }
            }
        }
    }

    /// Current state without advancing the stream.
    pub fn snapshot(&self) -> FrameSnapshot {
        let active = self.ledger.len();
        FrameSnapshot {
            frame_number: self.last_frame.unwrap_or(0),
            per_class_counts: self.per_class_counts(),
            total_distinct_tracks: self.registry.total_distinct(),
            tracks_in_frame: 0,
            active_crossing: active > 0,
            active_crossings: active,
            flips: Vec::new(),
        }
    }

    fn per_class_counts(&self) -> IndexMap<String, u64> {
        self.registry
            .counts()
            .iter()
            .map(|(class, count)| (class.to_string(), count))
            .collect()
    }

    /// e.g. `Overall traffic: 4 | car: 03, bus: 00, truck: 01`
    pub fn counts_line(&self) -> String {
        format!(
            "Overall traffic: {} | {}",
            self.registry.total_distinct(),
            self.registry.counts().summary_line()
        )
    }

    /// Accumulated state once the stream stops.
    pub fn final_report(&self) -> FinalReport {
        FinalReport {
            last_frame: self.last_frame,
            per_class_counts: self.per_class_counts(),
            total_distinct_tracks: self.registry.total_distinct(),
            lane_memberships: self.registry.membership_count(),
            active_crossings: self.ledger.active(),
            events_dropped: self.events.dropped_count(),
            metrics: self.metrics.summary(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.events.drain()
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &CrossingLedger {
        &self.ledger
    }

    pub fn lanes(&self) -> Option<&LaneConfig> {
        self.calibration.lanes()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
