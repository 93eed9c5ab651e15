// src/tracking/track_history.rs
//
// Per-track position history and speed estimation.
//
// Speed is measured between the oldest and newest retained positions of a
// track, converted from pixels with a fixed pixel-to-meter factor. Callers
// decide whether a speed is plausible via SpeedModel::accepts.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub x: f64,
    pub y: f64,
    pub timestamp_s: f64,
}

/// Acceptance band and calibration for speed estimates
#[derive(Debug, Clone, Copy)]
pub struct SpeedModel {
    pub pixel_to_meter: f64,
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self {
            pixel_to_meter: 0.05,
            min_kmh: 5.0,
            max_kmh: 150.0,
        }
    }
}

impl SpeedModel {
    /// Raw speed in km/h between two samples, `None` if no time has elapsed
    pub fn speed_kmh(&self, from: &PositionSample, to: &PositionSample) -> Option<f64> {
        let dt = to.timestamp_s - from.timestamp_s;
        if dt <= 0.0 {
            return None;
        }
        let dist_px = (to.x - from.x).hypot(to.y - from.y);
        let dist_m = dist_px * self.pixel_to_meter;
        Some(dist_m / dt * 3.6)
    }

    pub fn accepts(&self, speed_kmh: f64) -> bool {
        speed_kmh > self.min_kmh && speed_kmh < self.max_kmh
    }
}

pub struct TrackHistory {
    tracks: HashMap<u64, VecDeque<PositionSample>>,
    max_len: usize,
}

impl TrackHistory {
    pub fn new(max_len: usize) -> Self {
        Self {
            tracks: HashMap::new(),
            max_len: max_len.max(2),
        }
    }

    /// Append a position, creating the track entry on first sight
    pub fn record(&mut self, track_id: u64, sample: PositionSample) {
        let max_len = self.max_len;
        let history = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| VecDeque::with_capacity(max_len));
        history.push_back(sample);
        if history.len() > max_len {
            history.pop_front();
        }
    }

    /// Speed over the retained span, or `None` with fewer than two samples
    pub fn span_speed(&self, track_id: u64, model: &SpeedModel) -> Option<f64> {
        let history = self.tracks.get(&track_id)?;
        if history.len() < 2 {
            return None;
        }
        let first = history.front()?;
        let last = history.back()?;
        model.speed_kmh(first, last)
    }

    /// Drop tracks whose newest sample is older than `max_age_s` at `now_s`.
    /// Returns the ids that were removed.
    pub fn prune_idle(&mut self, now_s: f64, max_age_s: f64) -> Vec<u64> {
        let mut removed = Vec::new();
        self.tracks.retain(|&track_id, history| {
            let fresh = history
                .back()
                .map(|last| now_s - last.timestamp_s <= max_age_s)
                .unwrap_or(false);
            if !fresh {
                removed.push(track_id);
            }
            fresh
        });
        removed
    }

    pub fn samples(&self, track_id: u64) -> usize {
        self.tracks.get(&track_id).map(|h| h.len()).unwrap_or(0)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, t: f64) -> PositionSample {
        PositionSample {
            x,
            y,
            timestamp_s: t,
        }
    }

    #[test]
    fn test_speed_conversion() {
        let model = SpeedModel::default();
        // 200 px * 0.05 = 10 m in 1 s = 36 km/h
        let speed = model.speed_kmh(&sample(0.0, 0.0, 0.0), &sample(120.0, 160.0, 1.0));
        assert!((speed.unwrap() - 36.0).abs() < 1e-9);
        assert!(model
            .speed_kmh(&sample(0.0, 0.0, 1.0), &sample(10.0, 0.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_acceptance_band_is_exclusive() {
        let model = SpeedModel::default();
        assert!(!model.accepts(5.0));
        assert!(model.accepts(5.1));
        assert!(model.accepts(149.9));
        assert!(!model.accepts(150.0));
    }

    #[test]
    fn test_history_bounded_and_uses_span() {
        let model = SpeedModel::default();
        let mut history = TrackHistory::new(3);

        history.record(7, sample(0.0, 0.0, 0.0));
        assert_eq!(history.span_speed(7, &model), None);

        for i in 1..=4 {
            history.record(7, sample(0.0, 100.0 * i as f64, i as f64));
        }
        assert_eq!(history.samples(7), 3);
        // Retained y = 200, 300, 400 over 2 s → 10 m / 2 s = 18 km/h
        let speed = history.span_speed(7, &model).unwrap();
        assert!(model.accepts(speed));
        assert!((speed - 18.0).abs() < 1e-9);
        assert_eq!(history.track_count(), 1);
    }

    #[test]
    fn test_implausible_speed_rejected() {
        let model = SpeedModel::default();
        let mut history = TrackHistory::new(10);
        history.record(1, sample(0.0, 0.0, 0.0));
        history.record(1, sample(2.0, 0.0, 1.0));
        let speed = history.span_speed(1, &model).unwrap();
        assert!(!model.accepts(speed));
        assert!(history.span_speed(99, &model).is_none());
    }

    #[test]
    fn test_prune_idle_drops_stale_tracks() {
        let mut history = TrackHistory::new(10);
        history.record(1, sample(0.0, 0.0, 0.0));
        history.record(2, sample(0.0, 0.0, 0.0));
        history.record(2, sample(0.0, 10.0, 3.0));

        // Exactly at the age limit is still fresh
        assert!(history.prune_idle(2.0, 2.0).is_empty());

        let removed = history.prune_idle(4.5, 2.0);
        assert_eq!(removed, vec![1]);
        assert_eq!(history.track_count(), 1);
        assert_eq!(history.samples(2), 2);
    }
}
