// src/counting/mod.rs
//
// Cross-frame state: which tracks were counted, which side of each lane
// line they occupy, and which recently flipped sides.

pub mod crossing_ledger;
pub mod registry;

pub use crossing_ledger::{CrossingEvent, CrossingLedger};
pub use registry::{ClassCounts, CountingOutcome, LineFlip, TrackMembership, TrackRegistry};

pub type TrackId = u64;
