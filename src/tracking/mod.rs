// src/tracking/mod.rs
//
// Glue between an upstream tracker and the window aggregator. Tracked
// positions become one Observation per frame:
//   count       = objects on the frame
//   speeds      = plausible span speeds of those objects
//   crossed_ids = objects crossing the counting line for the first time
//
// Vehicles whose raw span speed exceeds the speed limit raise one
// OverspeedEvent per track. Tracks idle for longer than max_track_age_s are
// dropped together with their counted/alerted markers.

pub mod line_counter;
pub mod track_history;

pub use line_counter::LineCounter;
pub use track_history::{PositionSample, SpeedModel, TrackHistory};

use crate::types::{Observation, OverspeedEvent, TrackedFrame, TrackingConfig};
use std::collections::HashSet;
use tracing::debug;

pub struct ObservationBuilder {
    history: TrackHistory,
    counter: LineCounter,
    model: SpeedModel,
    speed_limit_kmh: f64,
    max_track_age_s: f64,
    alerted: HashSet<u64>,
    overspeed: Vec<OverspeedEvent>,
}

impl ObservationBuilder {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            history: TrackHistory::new(config.history_len),
            counter: LineCounter::new(config.line_y),
            model: SpeedModel {
                pixel_to_meter: config.pixel_to_meter,
                min_kmh: config.min_speed_kmh,
                max_kmh: config.max_speed_kmh,
            },
            speed_limit_kmh: config.speed_limit_kmh,
            max_track_age_s: config.max_track_age_s,
            alerted: HashSet::new(),
            overspeed: Vec::new(),
        }
    }

    pub fn build(&mut self, frame: &TrackedFrame) -> Observation {
        let mut observation = Observation {
            count: frame.objects.len() as u32,
            ..Observation::default()
        };

        for object in &frame.objects {
            self.history.record(
                object.track_id,
                PositionSample {
                    x: object.cx,
                    y: object.cy,
                    timestamp_s: frame.timestamp_s,
                },
            );

            if let Some(speed) = self.history.span_speed(object.track_id, &self.model) {
                if self.model.accepts(speed) {
                    observation.speeds.push(speed);
                }
                // Limit is checked against the unfiltered speed
                if speed > self.speed_limit_kmh && self.alerted.insert(object.track_id) {
                    self.overspeed.push(OverspeedEvent {
                        track_id: object.track_id,
                        speed_kmh: speed,
                        timestamp_s: frame.timestamp_s,
                    });
                }
            }

            if self.counter.check(object.track_id, object.cy) {
                observation.crossed_ids.insert(object.track_id);
            }
        }

        let stale = self
            .history
            .prune_idle(frame.timestamp_s, self.max_track_age_s);
        if !stale.is_empty() {
            debug!("🗑️  {} idle track(s) pruned", stale.len());
            self.counter.forget(&stale);
            for track_id in &stale {
                self.alerted.remove(track_id);
            }
        }

        observation
    }

    /// Overspeed alerts raised since the last call
    pub fn drain_overspeed(&mut self) -> Vec<OverspeedEvent> {
        std::mem::take(&mut self.overspeed)
    }

    pub fn total_crossings(&self) -> usize {
        self.counter.total()
    }

    /// Tracks currently held in memory
    pub fn tracks_seen(&self) -> usize {
        self.history.track_count()
    }

    /// Per-track markers (counted + alerted) currently held in memory
    pub fn markers_held(&self) -> usize {
        self.counter.remembered() + self.alerted.len()
    }
}
