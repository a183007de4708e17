// src/geometry.rs
//
// Lane boundary lines and the side-of-line test.
//
// Coordinates are frame pixels with y growing downward, so a point is
// ABOVE a line when its y is smaller than the line's y at the same x.

use serde::{Deserialize, Serialize};

/// Denominator used for the slope of a vertical segment (x1 == x2).
pub const VERTICAL_SLOPE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Below,
    Above,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Below => "BELOW",
            Self::Above => "ABOVE",
        }
    }
}

/// Which of the two lane boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineId {
    Left,
    Right,
}

impl LineId {
    pub const BOTH: [LineId; 2] = [LineId::Left, LineId::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// Maps a side to the stored membership flag of one line.
///
/// The two lane boundaries conventionally use opposite polarities, so the
/// flag reads as "inside the lane" for both. Flip detection only compares
/// flags, so polarity never changes which observations produce a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinePolarity {
    AboveIsSet,
    AboveIsClear,
}

impl LinePolarity {
    pub fn flag(&self, side: Side) -> bool {
        match self {
            Self::AboveIsSet => side == Side::Above,
            Self::AboveIsClear => side == Side::Below,
        }
    }

    pub fn side(&self, flag: bool) -> Side {
        match (self, flag) {
            (Self::AboveIsSet, true) | (Self::AboveIsClear, false) => Side::Above,
            _ => Side::Below,
        }
    }
}

/// A boundary line through two endpoints, serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct LaneLine {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    slope: f32,
}

impl LaneLine {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let dx = x1 - x2;
        let dx = if dx == 0.0 { VERTICAL_SLOPE_EPSILON } else { dx };
        Self {
            x1,
            y1,
            x2,
            y2,
            slope: (y1 - y2) / dx,
        }
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    /// Line y-value at the given x, extrapolated from the first endpoint.
    pub fn y_at(&self, x: f32) -> f32 {
        self.slope * (x - self.x1) + self.y1
    }

    pub fn side_of(&self, point: (f32, f32)) -> Side {
        side_of_line(self, point)
    }
}

impl From<[f32; 4]> for LaneLine {
    fn from(p: [f32; 4]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }
}

impl From<LaneLine> for [f32; 4] {
    fn from(line: LaneLine) -> Self {
        [line.x1, line.y1, line.x2, line.y2]
    }
}

pub fn side_of_line(line: &LaneLine, point: (f32, f32)) -> Side {
    let (x, y) = point;
    if y < line.y_at(x) {
        Side::Above
    } else {
        Side::Below
    }
}

/// The left and right lane boundaries, fixed after warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneConfig {
    pub left: LaneLine,
    pub right: LaneLine,
}

impl LaneConfig {
    pub fn new(left: LaneLine, right: LaneLine) -> Self {
        Self { left, right }
    }

    pub fn line(&self, id: LineId) -> &LaneLine {
        match id {
            LineId::Left => &self.left,
            LineId::Right => &self.right,
        }
    }

    pub fn side(&self, id: LineId, point: (f32, f32)) -> Side {
        side_of_line(self.line(id), point)
    }
}

/// Reference point of a bounding box `[xmin, ymin, xmax, ymax]`.
pub fn bbox_center(bbox: &[f32; 4]) -> (f32, f32) {
    (
        (bbox[0] + bbox[2]).abs() * 0.5,
        (bbox[1] + bbox[3]).abs() * 0.5,
    )
}
