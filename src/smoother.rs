// src/smoother.rs

use std::collections::VecDeque;

/// Moving average over the last few per-window speed variances
#[derive(Debug, Clone)]
pub struct SpeedVarianceSmoother {
    history: VecDeque<f64>,
    window_size: usize,
}

impl SpeedVarianceSmoother {
    /// Create a new smoother with specified window size
    ///
    /// # Arguments
    /// * `window_size` - Number of windows to average over (e.g., 3 windows)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Record this window's variance and return the smoothed value
    pub fn smooth(&mut self, variance: f64) -> f64 {
        if self.history.len() == self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(variance);

        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    pub fn history_size(&self) -> usize {
        self.history.len()
    }
}

/// Variance of per-object speed samples for one window.
///
/// Three or more samples use the population variance; exactly two use
/// `(s0 - s1)^2 / 2`; fewer than two give zero.
pub fn speed_variance(speeds: &[f64]) -> f64 {
    match speeds.len() {
        0 | 1 => 0.0,
        2 => (speeds[0] - speeds[1]).powi(2) / 2.0,
        n => {
            let mean = speeds.iter().sum::<f64>() / n as f64;
            speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64
        }
    }
}
