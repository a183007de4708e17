// src/pipeline/event_bus.rs
//
// Decoupled event system. The orchestrator publishes what happened on each
// frame; presentation and export layers drain the queue at their own pace.

use crate::counting::TrackId;
use crate::geometry::{LaneConfig, LineId, Side};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    LanesCalibrated {
        frame: u64,
        lanes: LaneConfig,
    },

    VehicleCounted {
        frame: u64,
        track_id: TrackId,
        class_name: String,
        class_total: u64,
    },

    LineFlipped {
        frame: u64,
        track_id: TrackId,
        line: LineId,
        side: Side,
    },

    CrossingStarted {
        frame: u64,
        track_id: TrackId,
    },

    CrossingExpired {
        frame: u64,
        track_id: TrackId,
        last_frame: u64,
    },
}

pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    max_pending: usize,
    dropped: u64,
    // Set while the queue is full; cleared by `drain`
    overflowing: bool,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
            dropped: 0,
            overflowing: false,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.max_pending == 0 {
            self.dropped += 1;
            return;
        }
        if self.events.len() >= self.max_pending {
            if !self.overflowing {
                warn!(
                    "Event bus full ({} events), dropping oldest until drained",
                    self.max_pending
                );
                self.overflowing = true;
            }
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.overflowing = false;
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(frame: u64) -> PipelineEvent {
        PipelineEvent::CrossingStarted { frame, track_id: 1 }
    }

    #[test]
    fn test_drain_in_publish_order() {
        let mut bus = EventBus::new(8);
        bus.publish(started(1));
        bus.publish(started(2));
        assert_eq!(bus.pending_count(), 2);
        assert_eq!(bus.drain(), vec![started(1), started(2)]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_oldest() {
        let mut bus = EventBus::new(2);
        for frame in 1..=3 {
            bus.publish(started(frame));
        }
        assert_eq!(bus.dropped_count(), 1);
        assert_eq!(bus.drain(), vec![started(2), started(3)]);
    }

    #[test]
    fn test_overflow_run_resets_on_drain() {
        let mut bus = EventBus::new(2);
        for frame in 1..=10 {
            bus.publish(started(frame));
        }
        assert!(bus.overflowing);
        assert_eq!(bus.dropped_count(), 8);

        bus.drain();
        assert!(!bus.overflowing);
        bus.publish(started(11));
        assert!(!bus.overflowing);
    }

    #[test]
    fn test_zero_capacity_disables_queue() {
        let mut bus = EventBus::new(0);
        bus.publish(started(1));
        assert_eq!(bus.pending_count(), 0);
        assert_eq!(bus.dropped_count(), 1);
        assert!(!bus.overflowing);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(PipelineEvent::LineFlipped {
            frame: 40,
            track_id: 7,
            line: LineId::Left,
            side: Side::Above,
        })
        .unwrap();
        assert_eq!(json["type"], "line_flipped");
        assert_eq!(json["line"], "left");
        assert_eq!(json["side"], "ABOVE");
    }
}
