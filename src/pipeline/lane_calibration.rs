// src/pipeline/lane_calibration.rs
//
// Lane geometry warm-up. The lane detector runs on the first few frames of
// the stream; the most recent result wins. Once the warm-up window has
// passed the geometry is frozen for the rest of the stream.
//
// The window counts frames processed, not frame numbers, so a stream that
// starts mid-video still gets its warm-up.

use crate::geometry::LaneConfig;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// Lane mode disabled; offers are ignored.
    Disabled,
    /// Inside the warm-up window, no geometry yet.
    Waiting,
    /// Inside the warm-up window with geometry; later offers replace it.
    Provisional,
    /// Warm-up over. Geometry (if any) never changes again.
    Frozen,
}

pub struct LaneCalibration {
    warmup_frames: u64,
    frames_seen: u64,
    lanes: Option<LaneConfig>,
    state: CalibrationState,
}

impl LaneCalibration {
    pub fn new(enabled: bool, warmup_frames: u64) -> Self {
        Self {
            warmup_frames,
            frames_seen: 0,
            lanes: None,
            state: if enabled {
                CalibrationState::Waiting
            } else {
                CalibrationState::Disabled
            },
        }
    }

    /// Advance one frame, applying a lane detector result if one was offered.
    /// Call once per processed frame; `frame` is only used for logging.
    /// Returns true when the offer was accepted.
    pub fn update(&mut self, frame: u64, offer: Option<LaneConfig>) -> bool {
        match self.state {
            CalibrationState::Disabled | CalibrationState::Frozen => {
                if offer.is_some() {
                    debug!(
                        "Lane geometry offered at frame {} ignored ({:?})",
                        frame, self.state
                    );
                }
                return false;
            }
            CalibrationState::Waiting | CalibrationState::Provisional => {}
        }

        self.frames_seen += 1;
        if self.frames_seen > self.warmup_frames {
            self.freeze(frame);
            if offer.is_some() {
                debug!("Lane geometry offered at frame {} after warm-up, ignored", frame);
            }
            return false;
        }

        match offer {
            Some(lanes) => {
                self.lanes = Some(lanes);
                self.state = CalibrationState::Provisional;
                debug!(
                    "Lane geometry at frame {}: left slope {:.3}, right slope {:.3}",
                    frame,
                    lanes.left.slope(),
                    lanes.right.slope()
                );
                true
            }
            None => false,
        }
    }

    fn freeze(&mut self, frame: u64) {
        self.state = CalibrationState::Frozen;
        match &self.lanes {
            Some(_) => info!("Lane geometry frozen at frame {}", frame),
            None => warn!(
                "No lane geometry within {} warm-up frames; lane crossing disabled",
                self.warmup_frames
            ),
        }
    }

    pub fn lanes(&self) -> Option<&LaneConfig> {
        match self.state {
            CalibrationState::Disabled => None,
            _ => self.lanes.as_ref(),
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LaneLine;

    fn lanes(y: f32) -> LaneConfig {
        LaneConfig::new(
            LaneLine::new(0.0, y, 100.0, y),
            LaneLine::new(0.0, y + 100.0, 100.0, y + 100.0),
        )
    }

    #[test]
    fn test_disabled_ignores_offers() {
        let mut cal = LaneCalibration::new(false, 4);
        assert!(!cal.update(1, Some(lanes(300.0))));
        assert!(cal.lanes().is_none());
        assert_eq!(cal.state(), CalibrationState::Disabled);
    }

    #[test]
    fn test_latest_offer_within_warmup_wins() {
        let mut cal = LaneCalibration::new(true, 4);
        assert!(cal.update(1, Some(lanes(300.0))));
        assert_eq!(cal.state(), CalibrationState::Provisional);
        assert!(cal.update(4, Some(lanes(310.0))));
        assert_eq!(cal.lanes(), Some(&lanes(310.0)));
    }

    #[test]
    fn test_frozen_after_warmup() {
        let mut cal = LaneCalibration::new(true, 4);
        cal.update(1, None);
        cal.update(2, Some(lanes(300.0)));
        cal.update(3, None);
        cal.update(4, None);
        assert!(!cal.update(5, Some(lanes(999.0))));
        assert_eq!(cal.state(), CalibrationState::Frozen);
        assert_eq!(cal.lanes(), Some(&lanes(300.0)));
        assert!(!cal.update(6, Some(lanes(999.0))));
        assert_eq!(cal.lanes(), Some(&lanes(300.0)));
    }

    #[test]
    fn test_warmup_counts_from_first_frame_seen() {
        let mut cal = LaneCalibration::new(true, 4);
        assert!(cal.update(1000, Some(lanes(300.0))));
        assert!(!cal.update(1001, None));
        assert!(!cal.update(1002, None));
        assert!(cal.update(1003, Some(lanes(320.0))));
        assert_eq!(cal.state(), CalibrationState::Provisional);

        assert!(!cal.update(1004, Some(lanes(999.0))));
        assert_eq!(cal.state(), CalibrationState::Frozen);
        assert_eq!(cal.lanes(), Some(&lanes(320.0)));
    }

    #[test]
    fn test_no_geometry_during_warmup() {
        let mut cal = LaneCalibration::new(true, 2);
        cal.update(1, None);
        cal.update(2, None);
        cal.update(3, None);
        assert_eq!(cal.state(), CalibrationState::Frozen);
        assert!(cal.lanes().is_none());
    }
}
