// src/replay.rs
//
// Recorded tracker output, one JSON object per line:
//
//   {"frame": 1, "tracks": [{"id": 7, "class_name": "car",
//     "bbox": [600, 380, 680, 420]}], "lanes": {"left": [..], "right": [..]}}
//
// `lanes` is optional and only meaningful during lane warm-up. Blank lines
// and lines starting with `#` are skipped.

use crate::geometry::LaneConfig;
use crate::types::TrackObservation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub frame: u64,
    #[serde(default)]
    pub tracks: Vec<TrackObservation>,
    #[serde(default)]
    pub lanes: Option<LaneConfig>,
}

pub struct ReplayReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl ReplayReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening replay {}", path.display()))?;
        info!("Replaying tracks from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<ReplayFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(
                        Err(e).with_context(|| format!("reading replay line {}", self.line_no)),
                    )
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(
                serde_json::from_str(trimmed)
                    .with_context(|| format!("parsing replay line {}", self.line_no)),
            );
        }
    }
}
