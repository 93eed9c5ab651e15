// src/pipeline/orchestrator.rs
//
// Frame-sequential driver: observation → window aggregator → stability
// engine → alert gate. Each frame is processed to completion before the next;
// only the frame that closes a window produces output.
//
// Stream time is derived from the frame index (`frame_id / frame_rate`), so
// replays of the same input give the same alert timing.
//
// Tracked input additionally raises per-vehicle overspeed alerts, published
// on the bus as soon as the frame that triggered them is processed.

use super::event_bus::{EventBus, PipelineEvent};
use super::metrics::PipelineMetrics;
use crate::alert_gate::AlertGate;
use crate::analysis::StabilityEngine;
use crate::tracking::ObservationBuilder;
use crate::types::{
    CongestionEvent, Config, FrameInput, Observation, ScoreResult, WindowSummary,
};
use crate::window_aggregator::WindowAggregator;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything produced by the frame that closed a window
#[derive(Debug, Clone)]
pub struct WindowOutcome {
    pub frame_id: u64,
    pub timestamp_s: f64,
    pub summary: WindowSummary,
    pub result: ScoreResult,
    pub alert: Option<CongestionEvent>,
}

pub struct PipelineOrchestrator {
    aggregator: WindowAggregator,
    engine: StabilityEngine,
    gate: AlertGate,
    builder: ObservationBuilder,
    bus: EventBus,
    metrics: PipelineMetrics,
    frame_rate: f64,
    frame_id: u64,
}

impl PipelineOrchestrator {
    pub fn new(config: &Config) -> Self {
        let engine_config = config.engine.clone();
        info!(
            "🧠 TVSI pipeline: {} frames/window, ROI {:.0} m², congestion density {:.3}/m²",
            engine_config.frames_per_window(),
            engine_config.roi_area_m2,
            engine_config.congestion_density_threshold
        );

        Self {
            aggregator: WindowAggregator::from_config(&engine_config),
            gate: AlertGate::new(engine_config.alert_min_interval_sec),
            builder: ObservationBuilder::new(&config.tracking),
            bus: EventBus::new(config.io.max_pending_events),
            metrics: PipelineMetrics::new(),
            frame_rate: engine_config.frame_rate,
            frame_id: 0,
            engine: StabilityEngine::new(engine_config),
        }
    }

    /// Feed one input line (tracked objects or a prepared observation)
    pub fn process_input(&mut self, input: &FrameInput) -> Option<WindowOutcome> {
        match input {
            FrameInput::Tracked(frame) => {
                let observation = self.builder.build(frame);
                for event in self.builder.drain_overspeed() {
                    warn!(
                        "🚨 OVERSPEED: track {} at {:.1} km/h (t={:.2}s)",
                        event.track_id, event.speed_kmh, event.timestamp_s
                    );
                    self.metrics.inc(&self.metrics.overspeed_alerts);
                    self.bus.publish(PipelineEvent::OverspeedAlert(event));
                }
                self.process_observation(observation, frame.anomaly)
            }
            FrameInput::Observed {
                observation,
                anomaly,
            } => self.process_observation(observation.clone(), *anomaly),
        }
    }

    /// Feed one frame; returns the outcome when the frame completes a window.
    ///
    /// `anomaly` of the closing frame is the window's anomaly signal.
    pub fn process_observation(
        &mut self,
        observation: Observation,
        anomaly: f64,
    ) -> Option<WindowOutcome> {
        self.frame_id += 1;
        self.metrics.inc(&self.metrics.total_frames);
        if observation.count > 0 {
            self.metrics.inc(&self.metrics.frames_with_objects);
        }
        self.metrics
            .add(&self.metrics.speed_samples, observation.speeds.len() as u64);
        self.metrics
            .add(&self.metrics.line_crossings, observation.crossed_ids.len() as u64);

        let summary = self.aggregator.push(observation)?;
        let timestamp_s = self.stream_time_s();

        let was_ready = self.engine.baseline().is_ready();
        let started = Instant::now();
        let result = self.engine.score_window(&summary, anomaly);
        self.metrics.set_timing(
            &self.metrics.score_time_us,
            started.elapsed().as_micros() as u64,
        );
        self.metrics.inc(&self.metrics.windows_scored);

        if !was_ready && result.baseline_ready() {
            self.bus.publish(PipelineEvent::BaselineCalibrated {
                frame_id: self.frame_id,
                windows_scored: self.engine.windows_scored(),
            });
        }

        info!(
            "{} TVSI: {:.3} | {} | {}",
            result.severity.emoji(),
            result.tvsi,
            result.state.as_str(),
            result.trend.as_str()
        );
        info!("   {}", result.explanation);

        let alert = if result.congestion_detected {
            self.metrics.inc(&self.metrics.congestion_windows);
            let alert = self.gate.maybe_log(&result, &summary, timestamp_s);
            match &alert {
                Some(event) => {
                    self.metrics.inc(&self.metrics.alerts_fired);
                    self.bus.publish(PipelineEvent::CongestionAlert(event.clone()));
                }
                None => {
                    self.metrics.inc(&self.metrics.alerts_suppressed);
                    debug!("Congestion persists, alert debounced at {:.1}s", timestamp_s);
                }
            }
            alert
        } else {
            None
        };

        self.bus.publish(PipelineEvent::WindowScored {
            frame_id: self.frame_id,
            timestamp_s,
            summary: summary.clone(),
            result: result.clone(),
        });

        Some(WindowOutcome {
            frame_id: self.frame_id,
            timestamp_s,
            summary,
            result,
            alert,
        })
    }

    fn stream_time_s(&self) -> f64 {
        if self.frame_rate > 0.0 {
            self.frame_id as f64 / self.frame_rate
        } else {
            0.0
        }
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.bus.drain()
    }

    pub fn engine(&self) -> &StabilityEngine {
        &self.engine
    }

    pub fn alerts(&self) -> &[CongestionEvent] {
        self.gate.events()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_id
    }

    pub fn total_crossings(&self) -> usize {
        self.builder.total_crossings()
    }
}
