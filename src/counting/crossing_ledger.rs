// src/counting/crossing_ledger.rs
//
// Time-bounded record of recent side flips, keyed by track id.
// An entry lives while `current_frame - last_frame <= window`.

use std::collections::HashMap;

use super::TrackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub last_frame: u64,
}

#[derive(Debug, Default)]
pub struct CrossingLedger {
    entries: HashMap<TrackId, u64>,
}

impl CrossingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this starts a new crossing for the track.
    pub fn record_flip(&mut self, track_id: TrackId, frame: u64) -> bool {
        self.entries.insert(track_id, frame).is_none()
    }

    /// Remove entries older than the window and return how many remain.
    pub fn expire(&mut self, current_frame: u64, window: u64) -> usize {
        self.drain_expired(current_frame, window);
        self.entries.len()
    }

    /// Remove and return the expired entries, oldest first.
    pub fn drain_expired(&mut self, current_frame: u64, window: u64) -> Vec<CrossingEvent> {
        let mut expired: Vec<CrossingEvent> = self
            .entries
            .iter()
            .filter(|(_, &last)| current_frame.saturating_sub(last) > window)
            .map(|(&track_id, &last_frame)| CrossingEvent {
                track_id,
                last_frame,
            })
            .collect();

        for event in &expired {
            self.entries.remove(&event.track_id);
        }
        expired.sort_by_key(|e| (e.last_frame, e.track_id));
        expired
    }

    pub fn get(&self, track_id: TrackId) -> Option<CrossingEvent> {
        self.entries.get(&track_id).map(|&last_frame| CrossingEvent {
            track_id,
            last_frame,
        })
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.entries.contains_key(&track_id)
    }

    /// Active crossings sorted by track id.
    pub fn active(&self) -> Vec<CrossingEvent> {
        let mut events: Vec<CrossingEvent> = self
            .entries
            .iter()
            .map(|(&track_id, &last_frame)| CrossingEvent {
                track_id,
                last_frame,
            })
            .collect();
        events.sort_by_key(|e| e.track_id);
        events
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire_empty_ledger() {
        let mut ledger = CrossingLedger::new();
        assert_eq!(ledger.expire(100, 30), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_entry_lives_through_window() {
        let mut ledger = CrossingLedger::new();
        assert!(ledger.record_flip(7, 40));
        for frame in 40..=70 {
            assert_eq!(ledger.expire(frame, 30), 1, "frame {}", frame);
        }
        assert_eq!(ledger.expire(71, 30), 0);
        assert!(!ledger.contains(7));
    }

    #[test]
    fn test_record_flip_overwrites() {
        let mut ledger = CrossingLedger::new();
        assert!(ledger.record_flip(3, 10));
        assert!(!ledger.record_flip(3, 25));
        assert_eq!(
            ledger.get(3),
            Some(CrossingEvent {
                track_id: 3,
                last_frame: 25
            })
        );
        assert_eq!(ledger.expire(50, 30), 1);
        assert_eq!(ledger.expire(56, 30), 0);
    }

    #[test]
    fn test_expire_removes_adjacent_entries() {
        // Several consecutive stale entries must all go in one pass
        let mut ledger = CrossingLedger::new();
        for id in 1..=5 {
            ledger.record_flip(id, 1);
        }
        ledger.record_flip(6, 90);
        let expired = ledger.drain_expired(100, 30);
        assert_eq!(expired.len(), 5);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(6));
    }

    #[test]
    fn test_drain_expired_ordered() {
        let mut ledger = CrossingLedger::new();
        ledger.record_flip(2, 20);
        ledger.record_flip(1, 10);
        ledger.record_flip(3, 10);
        let ids: Vec<_> = ledger.drain_expired(100, 30).iter().map(|e| e.track_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_active_sorted_by_id() {
        let mut ledger = CrossingLedger::new();
        ledger.record_flip(9, 5);
        ledger.record_flip(4, 6);
        let ids: Vec<_> = ledger.active().iter().map(|e| e.track_id).collect();
        assert_eq!(ids, vec![4, 9]);
    }
}
