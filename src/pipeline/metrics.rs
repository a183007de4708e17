// src/pipeline/metrics.rs
//
// Counters for every stage of the per-frame pipeline. Atomics so a
// reporting thread can read them while the pipeline thread writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub frames_with_lanes: Arc<AtomicU64>,
    pub tracks_observed: Arc<AtomicU64>,
    pub tracks_skipped: Arc<AtomicU64>,
    pub vehicles_counted: Arc<AtomicU64>,
    pub ignored_observations: Arc<AtomicU64>,
    pub line_flips: Arc<AtomicU64>,
    pub crossings_started: Arc<AtomicU64>,
    pub crossings_expired: Arc<AtomicU64>,
    pub memberships_evicted: Arc<AtomicU64>,
    pub rejected_frames: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            frames_with_lanes: Arc::new(AtomicU64::new(0)),
            tracks_observed: Arc::new(AtomicU64::new(0)),
            tracks_skipped: Arc::new(AtomicU64::new(0)),
            vehicles_counted: Arc::new(AtomicU64::new(0)),
            ignored_observations: Arc::new(AtomicU64::new(0)),
            line_flips: Arc::new(AtomicU64::new(0)),
            crossings_started: Arc::new(AtomicU64::new(0)),
            crossings_expired: Arc::new(AtomicU64::new(0)),
            memberships_evicted: Arc::new(AtomicU64::new(0)),
            rejected_frames: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            frames_with_lanes: self.frames_with_lanes.load(Ordering::Relaxed),
            tracks_observed: self.tracks_observed.load(Ordering::Relaxed),
            tracks_skipped: self.tracks_skipped.load(Ordering::Relaxed),
            vehicles_counted: self.vehicles_counted.load(Ordering::Relaxed),
            ignored_observations: self.ignored_observations.load(Ordering::Relaxed),
            line_flips: self.line_flips.load(Ordering::Relaxed),
            crossings_started: self.crossings_started.load(Ordering::Relaxed),
            crossings_expired: self.crossings_expired.load(Ordering::Relaxed),
            memberships_evicted: self.memberships_evicted.load(Ordering::Relaxed),
            rejected_frames: self.rejected_frames.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_with_lanes: u64,
    pub tracks_observed: u64,
    pub tracks_skipped: u64,
    pub vehicles_counted: u64,
    pub ignored_observations: u64,
    pub line_flips: u64,
    pub crossings_started: u64,
    pub crossings_expired: u64,
    pub memberships_evicted: u64,
    pub rejected_frames: u64,
    pub last_frame_us: u64,
    pub elapsed_secs: f64,
}
