// src/pipeline/metrics.rs
//
// Counters for every stage of the scoring pipeline. Cloning shares the
// counters, so a reporter can read them while the pipeline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub frames_with_objects: Arc<AtomicU64>,
    pub speed_samples: Arc<AtomicU64>,
    pub line_crossings: Arc<AtomicU64>,
    pub windows_scored: Arc<AtomicU64>,
    pub congestion_windows: Arc<AtomicU64>,
    pub alerts_fired: Arc<AtomicU64>,
    pub alerts_suppressed: Arc<AtomicU64>,
    pub overspeed_alerts: Arc<AtomicU64>,
    pub score_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            frames_with_objects: Arc::new(AtomicU64::new(0)),
            speed_samples: Arc::new(AtomicU64::new(0)),
            line_crossings: Arc::new(AtomicU64::new(0)),
            windows_scored: Arc::new(AtomicU64::new(0)),
            congestion_windows: Arc::new(AtomicU64::new(0)),
            alerts_fired: Arc::new(AtomicU64::new(0)),
            alerts_suppressed: Arc::new(AtomicU64::new(0)),
            overspeed_alerts: Arc::new(AtomicU64::new(0)),
            score_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            frames_with_objects: self.frames_with_objects.load(Ordering::Relaxed),
            speed_samples: self.speed_samples.load(Ordering::Relaxed),
            line_crossings: self.line_crossings.load(Ordering::Relaxed),
            windows_scored: self.windows_scored.load(Ordering::Relaxed),
            congestion_windows: self.congestion_windows.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            overspeed_alerts: self.overspeed_alerts.load(Ordering::Relaxed),
            last_score_us: self.score_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_with_objects: u64,
    pub speed_samples: u64,
    pub line_crossings: u64,
    pub windows_scored: u64,
    pub congestion_windows: u64,
    pub alerts_fired: u64,
    pub alerts_suppressed: u64,
    pub overspeed_alerts: u64,
    pub last_score_us: u64,
    pub elapsed_secs: f64,
}
