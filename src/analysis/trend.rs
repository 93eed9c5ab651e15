// src/analysis/trend.rs

use crate::types::{TrafficState, Trend};
use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 100;

/// Minimum tvsi change across the last three windows to call a direction
const TREND_DELTA: f64 = 0.1;

/// Bounded record of past scores, used only for trend detection
pub struct TrendHistory {
    tvsi: VecDeque<f64>,
    states: VecDeque<TrafficState>,
    capacity: usize,
}

impl TrendHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            tvsi: VecDeque::with_capacity(capacity),
            states: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, tvsi: f64, state: TrafficState) {
        if self.tvsi.len() == self.capacity {
            self.tvsi.pop_front();
        }
        if self.states.len() == self.capacity {
            self.states.pop_front();
        }
        self.tvsi.push_back(tvsi);
        self.states.push_back(state);
    }

    pub fn trend(&self) -> Trend {
        let n = self.tvsi.len();
        if n < 3 {
            return Trend::Stable;
        }

        let diff = self.tvsi[n - 1] - self.tvsi[n - 3];
        if diff > TREND_DELTA {
            Trend::Improving
        } else if diff < -TREND_DELTA {
            Trend::Degrading
        } else {
            Trend::Stable
        }
    }

    pub fn len(&self) -> usize {
        self.tvsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tvsi.is_empty()
    }

    pub fn latest_state(&self) -> Option<TrafficState> {
        self.states.back().copied()
    }

    pub fn mean_tvsi(&self) -> Option<f64> {
        if self.tvsi.is_empty() {
            None
        } else {
            Some(self.tvsi.iter().sum::<f64>() / self.tvsi.len() as f64)
        }
    }
}

impl Default for TrendHistory {
    fn default() -> Self {
        Self::new()
    }
}
