// src/counting/registry.rs
//
// Per-track bookkeeping for distinct-vehicle counting and lane membership.
//
// Design:
//   - A track id is counted exactly once, the first time it is observed
//     with an allow-listed class. Counting never depends on lane geometry.
//   - When lanes are known, each counted track carries one flag per lane
//     line. Every later observation recomputes the sides and reports a
//     flip for each line whose side changed. Lines are independent: a
//     track may cross both in the same frame.
//   - Counted ids live in their own set so that evicting a stale
//     membership can never cause a recount.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::TrackId;
use crate::geometry::{bbox_center, LaneConfig, LineId, LinePolarity, Side};

// ============================================================================
// CLASS COUNTS
// ============================================================================

/// Running count of distinct tracks per allow-listed class.
#[derive(Debug, Clone)]
pub struct ClassCounts {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl ClassCounts {
    pub fn new<S: AsRef<str>>(allowed_classes: &[S]) -> Self {
        let mut order: Vec<String> = Vec::with_capacity(allowed_classes.len());
        for class in allowed_classes {
            let class = class.as_ref().to_string();
            if !order.contains(&class) {
                order.push(class);
            }
        }
        let counts = order.iter().map(|c| (c.clone(), 0)).collect();
        Self { order, counts }
    }

    pub fn is_allowed(&self, class_name: &str) -> bool {
        self.counts.contains_key(class_name)
    }

    fn increment(&mut self, class_name: &str) {
        if let Some(count) = self.counts.get_mut(class_name) {
            *count += 1;
        }
    }

    pub fn get(&self, class_name: &str) -> u64 {
        self.counts.get(class_name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Counts in allow-list order, including classes not yet seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.order
            .iter()
            .map(move |class| (class.as_str(), self.get(class)))
    }

    /// e.g. `car: 03, bus: 00, truck: 01`
    pub fn summary_line(&self) -> String {
        self.iter()
            .map(|(class, count)| format!("{}: {:02}", class, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

/// Side flags of one counted track against the two lane lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackMembership {
    pub left_side: bool,
    pub right_side: bool,
    pub last_seen_frame: u64,
}

impl TrackMembership {
    pub fn flag(&self, line: LineId) -> bool {
        match line {
            LineId::Left => self.left_side,
            LineId::Right => self.right_side,
        }
    }

    fn flag_mut(&mut self, line: LineId) -> &mut bool {
        match line {
            LineId::Left => &mut self.left_side,
            LineId::Right => &mut self.right_side,
        }
    }
}

/// A track's reference point changed sides of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFlip {
    pub line: LineId,
    /// Side the track is on after the flip
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountingOutcome {
    /// Never counted and not allow-listed; nothing recorded.
    Ignored,
    /// First observation of an allow-listed track.
    NewlyCounted,
    /// Already counted; zero, one or two lines flipped.
    Tracked { flips: Vec<LineFlip> },
}

impl CountingOutcome {
    pub fn newly_counted(&self) -> bool {
        matches!(self, Self::NewlyCounted)
    }

    pub fn flips(&self) -> &[LineFlip] {
        match self {
            Self::Tracked { flips } => flips,
            _ => &[],
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub struct TrackRegistry {
    counts: ClassCounts,
    counted: HashSet<TrackId>,
    memberships: HashMap<TrackId, TrackMembership>,
    left_polarity: LinePolarity,
    right_polarity: LinePolarity,
}

impl TrackRegistry {
    pub fn new<S: AsRef<str>>(
        allowed_classes: &[S],
        left_polarity: LinePolarity,
        right_polarity: LinePolarity,
    ) -> Self {
        Self {
            counts: ClassCounts::new(allowed_classes),
            counted: HashSet::new(),
            memberships: HashMap::new(),
            left_polarity,
            right_polarity,
        }
    }

    fn polarity(&self, line: LineId) -> LinePolarity {
        match line {
            LineId::Left => self.left_polarity,
            LineId::Right => self.right_polarity,
        }
    }

    fn membership_for(
        &self,
        lanes: &LaneConfig,
        center: (f32, f32),
        frame: u64,
    ) -> TrackMembership {
        let left = lanes.side(LineId::Left, center);
        let right = lanes.side(LineId::Right, center);
        TrackMembership {
            left_side: self.left_polarity.flag(left),
            right_side: self.right_polarity.flag(right),
            last_seen_frame: frame,
        }
    }

    /// Record one observation of a confirmed track.
    pub fn observe(
        &mut self,
        track_id: TrackId,
        class_name: &str,
        bbox: &[f32; 4],
        lanes: Option<&LaneConfig>,
        frame: u64,
    ) -> CountingOutcome {
        if !self.counted.contains(&track_id) {
            if !self.counts.is_allowed(class_name) {
                return CountingOutcome::Ignored;
            }
            self.counts.increment(class_name);
            self.counted.insert(track_id);

            if let Some(lanes) = lanes {
                let membership = self.membership_for(lanes, bbox_center(bbox), frame);
                self.memberships.insert(track_id, membership);
            }
            return CountingOutcome::NewlyCounted;
        }

        let Some(lanes) = lanes else {
            return CountingOutcome::Tracked { flips: Vec::new() };
        };
        let center = bbox_center(bbox);

        // Counted before lanes were known, or evicted: start from here.
        if !self.memberships.contains_key(&track_id) {
            let membership = self.membership_for(lanes, center, frame);
            self.memberships.insert(track_id, membership);
            debug!("Track {} joined lane membership late", track_id);
            return CountingOutcome::Tracked { flips: Vec::new() };
        }

        let polarities = [self.polarity(LineId::Left), self.polarity(LineId::Right)];
        let mut flips = Vec::new();
        if let Some(membership) = self.memberships.get_mut(&track_id) {
            membership.last_seen_frame = frame;
            for (line, polarity) in LineId::BOTH.into_iter().zip(polarities) {
                let side = lanes.side(line, center);
                let flag = polarity.flag(side);
                let stored = membership.flag_mut(line);
                if *stored != flag {
                    *stored = flag;
                    flips.push(LineFlip { line, side });
                }
            }
        }
        CountingOutcome::Tracked { flips }
    }

    /// Drop memberships not observed within `horizon` frames.
    /// Counted ids are kept, so an evicted track is never counted twice.
    pub fn evict_stale(&mut self, current_frame: u64, horizon: u64) -> usize {
        let before = self.memberships.len();
        self.memberships
            .retain(|_, m| current_frame.saturating_sub(m.last_seen_frame) <= horizon);
        before - self.memberships.len()
    }

    pub fn counts(&self) -> &ClassCounts {
        &self.counts
    }

    pub fn total_distinct(&self) -> usize {
        self.counted.len()
    }

    pub fn is_counted(&self, track_id: TrackId) -> bool {
        self.counted.contains(&track_id)
    }

    pub fn membership(&self, track_id: TrackId) -> Option<&TrackMembership> {
        self.memberships.get(&track_id)
    }

    /// Current side of a track against one line, from its stored flag.
    pub fn side(&self, track_id: TrackId, line: LineId) -> Option<Side> {
        self.memberships
            .get(&track_id)
            .map(|m| self.polarity(line).side(m.flag(line)))
    }

    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LaneLine;

    // Horizontal lines: left at y = 300, right at y = 500
    fn lanes() -> LaneConfig {
        LaneConfig::new(
            LaneLine::new(0.0, 300.0, 1280.0, 300.0),
            LaneLine::new(0.0, 500.0, 1280.0, 500.0),
        )
    }

    fn registry() -> TrackRegistry {
        TrackRegistry::new(
            &["car", "bus", "truck"],
            LinePolarity::AboveIsSet,
            LinePolarity::AboveIsClear,
        )
    }

    // Box centered at (640, cy)
    fn bbox_at(cy: f32) -> [f32; 4] {
        [600.0, cy - 20.0, 680.0, cy + 20.0]
    }

    #[test]
    fn test_counts_each_track_once() {
        let mut reg = registry();
        assert!(reg.observe(1, "car", &bbox_at(400.0), None, 1).newly_counted());
        for frame in 2..50 {
            let outcome = reg.observe(1, "car", &bbox_at(400.0), None, frame);
            assert!(!outcome.newly_counted());
        }
        assert_eq!(reg.counts().get("car"), 1);
        assert_eq!(reg.total_distinct(), 1);
    }

    #[test]
    fn test_disallowed_class_never_counted() {
        let mut reg = registry();
        for frame in 1..=50 {
            let outcome = reg.observe(9, "motorcycle", &bbox_at(400.0), Some(&lanes()), frame);
            assert_eq!(outcome, CountingOutcome::Ignored);
        }
        assert_eq!(reg.counts().total(), 0);
        assert!(!reg.counts().is_allowed("motorcycle"));
        assert!(!reg.is_counted(9));
        assert!(reg.membership(9).is_none());
        assert_eq!(reg.membership_count(), 0);
    }

    #[test]
    fn test_counts_per_class() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), None, 1);
        reg.observe(2, "car", &bbox_at(400.0), None, 1);
        reg.observe(3, "truck", &bbox_at(400.0), None, 1);
        reg.observe(4, "person", &bbox_at(400.0), None, 1);
        assert_eq!(reg.counts().get("car"), 2);
        assert_eq!(reg.counts().get("bus"), 0);
        assert_eq!(reg.counts().get("truck"), 1);
        assert_eq!(reg.total_distinct(), 3);
        assert_eq!(reg.counts().summary_line(), "car: 02, bus: 00, truck: 01");
    }

    #[test]
    fn test_membership_initialized_with_polarity() {
        let mut reg = registry();
        // Between the lines: below left, above right
        reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 1);
        let m = reg.membership(1).unwrap();
        assert!(!m.left_side);
        assert!(!m.right_side);
        assert_eq!(reg.side(1, LineId::Left), Some(Side::Below));
        assert_eq!(reg.side(1, LineId::Right), Some(Side::Above));
    }

    #[test]
    fn test_single_line_crossing_reports_one_flip() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 1);
        let outcome = reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 2);
        assert_eq!(
            outcome.flips(),
            &[LineFlip {
                line: LineId::Left,
                side: Side::Above
            }]
        );
        assert_eq!(reg.side(1, LineId::Left), Some(Side::Above));
    }

    #[test]
    fn test_both_lines_in_one_frame() {
        let mut reg = registry();
        reg.observe(1, "bus", &bbox_at(200.0), Some(&lanes()), 1);
        let outcome = reg.observe(1, "bus", &bbox_at(600.0), Some(&lanes()), 2);
        let lines: Vec<LineId> = outcome.flips().iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![LineId::Left, LineId::Right]);
        assert!(outcome.flips().iter().all(|f| f.side == Side::Below));
    }

    #[test]
    fn test_reobservation_is_idempotent() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 1);
        reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 2);
        let first = reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 3);
        let second = reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 3);
        assert!(first.flips().is_empty());
        assert!(second.flips().is_empty());
        assert_eq!(reg.counts().get("car"), 1);
    }

    #[test]
    fn test_flip_back_reports_again() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 1);
        assert_eq!(reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 2).flips().len(), 1);
        let back = reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 3);
        assert_eq!(
            back.flips(),
            &[LineFlip {
                line: LineId::Left,
                side: Side::Below
            }]
        );
    }

    #[test]
    fn test_no_lanes_no_flips() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), None, 1);
        let outcome = reg.observe(1, "car", &bbox_at(100.0), None, 2);
        assert_eq!(outcome, CountingOutcome::Tracked { flips: vec![] });
        assert!(reg.membership(1).is_none());
    }

    #[test]
    fn test_late_membership_has_no_flip() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), None, 1);
        let outcome = reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 2);
        assert!(outcome.flips().is_empty());
        assert_eq!(reg.side(1, LineId::Left), Some(Side::Above));
    }

    #[test]
    fn test_eviction_keeps_count() {
        let mut reg = registry();
        reg.observe(1, "car", &bbox_at(400.0), Some(&lanes()), 1);
        reg.observe(2, "car", &bbox_at(400.0), Some(&lanes()), 90);
        assert_eq!(reg.evict_stale(100, 50), 1);
        assert!(reg.membership(1).is_none());
        assert!(reg.membership(2).is_some());

        // Returning track is neither recounted nor reported as a flip
        let outcome = reg.observe(1, "car", &bbox_at(200.0), Some(&lanes()), 101);
        assert!(!outcome.newly_counted());
        assert!(outcome.flips().is_empty());
        assert_eq!(reg.counts().get("car"), 2);
    }
}
