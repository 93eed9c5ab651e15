// src/tracking/line_counter.rs

use std::collections::HashSet;

/// Counts each track once, the first time its bottom edge passes below the line
pub struct LineCounter {
    line_y: f64,
    counted: HashSet<u64>,
    total: usize,
}

impl LineCounter {
    pub fn new(line_y: f64) -> Self {
        Self {
            line_y,
            counted: HashSet::new(),
            total: 0,
        }
    }

    /// Returns true if this sighting is the track's first crossing
    pub fn check(&mut self, track_id: u64, bottom_y: f64) -> bool {
        let first = bottom_y > self.line_y && self.counted.insert(track_id);
        if first {
            self.total += 1;
        }
        first
    }

    /// Stop remembering tracks the tracker has let go of. The running total
    /// is kept.
    pub fn forget(&mut self, track_ids: &[u64]) {
        for track_id in track_ids {
            self.counted.remove(track_id);
        }
    }

    /// Vehicles counted since start
    pub fn total(&self) -> usize {
        self.total
    }

    /// Tracks currently remembered as already counted
    pub fn remembered(&self) -> usize {
        self.counted.len()
    }
}
