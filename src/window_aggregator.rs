// src/window_aggregator.rs
//
// Buffers per-frame observations into fixed-length windows. A summary is
// emitted exactly once every `frames_per_window` pushes; nothing is ever
// emitted for a partially filled window.

use crate::types::{EngineConfig, Observation, WindowSummary};
use std::collections::BTreeSet;
use tracing::debug;

pub struct WindowAggregator {
    frames_per_window: usize,
    frames: usize,
    crossed_ids: BTreeSet<u64>,
    speeds: Vec<f64>,
    counts: Vec<u32>,
}

impl WindowAggregator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_frames(config.frames_per_window())
    }

    pub fn with_frames(frames_per_window: usize) -> Self {
        let frames_per_window = frames_per_window.max(1);
        Self {
            frames_per_window,
            frames: 0,
            crossed_ids: BTreeSet::new(),
            speeds: Vec::new(),
            counts: Vec::with_capacity(frames_per_window),
        }
    }

    /// Add one frame; returns the window summary when this frame completes it
    pub fn push(&mut self, observation: Observation) -> Option<WindowSummary> {
        self.frames += 1;
        self.counts.push(observation.count);
        self.speeds.extend(observation.speeds);
        self.crossed_ids.extend(observation.crossed_ids);

        if self.frames < self.frames_per_window {
            return None;
        }

        let summary = self.summarize();
        debug!(
            "🪟 Window closed: {} frames, flow={}, avg_count={:.2}, {} speed samples",
            summary.frames,
            summary.flow,
            summary.avg_count,
            summary.speeds.len()
        );
        self.reset();
        Some(summary)
    }

    fn summarize(&mut self) -> WindowSummary {
        let avg_count = if self.counts.is_empty() {
            0.0
        } else {
            self.counts.iter().map(|&c| c as f64).sum::<f64>() / self.counts.len() as f64
        };

        let speeds = std::mem::take(&mut self.speeds);
        let avg_speed = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };

        WindowSummary {
            frames: self.frames,
            flow: self.crossed_ids.len() as u32,
            avg_count,
            speeds,
            avg_speed,
        }
    }

    /// Drop everything buffered for the current window
    pub fn reset(&mut self) {
        self.frames = 0;
        self.crossed_ids.clear();
        self.speeds.clear();
        self.counts.clear();
    }

    pub fn frames_per_window(&self) -> usize {
        self.frames_per_window
    }

    pub fn frames_in_window(&self) -> usize {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(count: u32, speeds: &[f64], crossed: &[u64]) -> Observation {
        Observation {
            count,
            speeds: speeds.to_vec(),
            crossed_ids: crossed.iter().copied().collect(),
        }
    }

    #[test]
    fn test_window_length_rounds_down() {
        let config = EngineConfig {
            window_duration_sec: 0.5,
            frame_rate: 9.0,
            ..EngineConfig::default()
        };
        let agg = WindowAggregator::from_config(&config);
        assert_eq!(agg.frames_per_window(), 4);
        assert_eq!(agg.frames_per_window(), config.frames_per_window());
    }

    #[test]
    fn test_emits_exactly_once_per_window() {
        let mut agg = WindowAggregator::with_frames(3);
        let mut emitted = Vec::new();

        for i in 0..9 {
            if agg.push(obs(1, &[], &[])).is_some() {
                emitted.push(i);
            }
        }

        assert_eq!(emitted, vec![2, 5, 8]);
        assert_eq!(agg.frames_in_window(), 0);
    }

    #[test]
    fn test_summary_contents() {
        let mut agg = WindowAggregator::with_frames(3);

        assert!(agg.push(obs(4, &[50.0], &[1, 2])).is_none());
        // id 2 repeated, must be counted once
        assert!(agg.push(obs(5, &[52.0, 48.0], &[2, 3])).is_none());
        let summary = agg.push(obs(6, &[], &[])).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.flow, 3);
        assert_eq!(summary.avg_count, 5.0);
        assert_eq!(summary.speeds, vec![50.0, 52.0, 48.0]);
        assert_eq!(summary.avg_speed, 50.0);
        assert_eq!(summary.vehicle_count(), 5);
    }

    #[test]
    fn test_state_resets_between_windows() {
        let mut agg = WindowAggregator::with_frames(2);

        agg.push(obs(10, &[80.0], &[7]));
        agg.push(obs(10, &[80.0], &[8]));

        agg.push(obs(0, &[], &[]));
        let second = agg.push(obs(1, &[], &[])).unwrap();

        assert_eq!(second.flow, 0);
        assert_eq!(second.avg_count, 0.5);
        assert_eq!(second.vehicle_count(), 0);
        assert!(second.speeds.is_empty());
        assert_eq!(second.avg_speed, 0.0);
    }
}
