// src/alert_gate.rs

use crate::types::{CongestionEvent, ScoreResult, WindowSummary};
use tracing::{debug, warn};

pub const DEFAULT_MIN_INTERVAL_SEC: f64 = 30.0;

/// Debounces congestion alerts: at most one every `min_interval_sec`
pub struct AlertGate {
    min_interval_sec: f64,
    last_alert_s: Option<f64>,
    events: Vec<CongestionEvent>,
}

impl AlertGate {
    pub fn new(min_interval_sec: f64) -> Self {
        Self {
            min_interval_sec,
            last_alert_s: None,
            events: Vec::new(),
        }
    }

    /// Decide whether this result raises a new congestion event.
    ///
    /// Fires only for congested results, and only if no alert fired yet or
    /// the previous one is at least `min_interval_sec` old.
    pub fn maybe_log(
        &mut self,
        result: &ScoreResult,
        summary: &WindowSummary,
        now_s: f64,
    ) -> Option<CongestionEvent> {
        if !result.congestion_detected {
            return None;
        }

        if let Some(last) = self.last_alert_s {
            if now_s - last < self.min_interval_sec {
                debug!(
                    "🔕 Congestion alert suppressed ({:.1}s since last)",
                    now_s - last
                );
                return None;
            }
        }

        self.last_alert_s = Some(now_s);
        let event = CongestionEvent {
            timestamp_s: now_s,
            flow: summary.flow,
            density: result.components.raw_density,
            avg_speed: summary.avg_speed,
            state: result.state,
            vehicle_count: result.components.vehicle_count,
        };

        warn!(
            "🚨 CONGESTION: {} | {} vehicles | Density: {:.4}/m² | Speed: {:.1} km/h",
            event.state.as_str(),
            event.vehicle_count,
            event.density,
            event.avg_speed
        );

        self.events.push(event.clone());
        Some(event)
    }

    pub fn events(&self) -> &[CongestionEvent] {
        &self.events
    }

    pub fn last_alert_s(&self) -> Option<f64> {
        self.last_alert_s
    }
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_SEC)
    }
}
