// src/analysis/baseline_calibrator.rs
//
// Learns the reference distribution of flow, density and speed variance from
// the first qualifying windows of a stream.
//
// Key rules:
//   - Only windows with traffic (flow > 0 or count > 0) are sampled
//   - Calibration happens exactly once, after `window_size` samples
//   - Floors keep normalization away from degenerate std values
//   - Once ready the stats are frozen for the lifetime of the engine

use crate::types::{BaselineStats, BaselineStatus, MetricBaseline};
use tracing::{debug, info};

// Priors used until calibration completes
const DEFAULT_FLOW: MetricBaseline = MetricBaseline { mean: 8.0, std: 3.0 };
const DEFAULT_DENSITY: MetricBaseline = MetricBaseline {
    mean: 0.015,
    std: 0.008,
};
const DEFAULT_SPEED_VARIANCE: MetricBaseline = MetricBaseline {
    mean: 80.0,
    std: 30.0,
};

const FLOW_MEAN_FLOOR: f64 = 3.0;
const FLOW_STD_FLOOR: f64 = 2.0;
const DENSITY_MEAN_FLOOR: f64 = 0.01;
const DENSITY_STD_FLOOR: f64 = 0.005;
const SPEED_VARIANCE_STD_FLOOR: f64 = 20.0;

pub struct BaselineCalibrator {
    window_size: usize,
    flow_samples: Vec<f64>,
    density_samples: Vec<f64>,
    speed_variance_samples: Vec<f64>,
    stats: BaselineStats,
}

impl BaselineCalibrator {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            flow_samples: Vec::with_capacity(window_size),
            density_samples: Vec::with_capacity(window_size),
            speed_variance_samples: Vec::with_capacity(window_size),
            stats: BaselineStats {
                flow: DEFAULT_FLOW,
                density: DEFAULT_DENSITY,
                speed_variance: DEFAULT_SPEED_VARIANCE,
                ready: false,
                samples_seen: 0,
            },
        }
    }

    /// Window qualifies for calibration only when traffic is present
    pub fn qualifies(flow: u32, vehicle_count: u32) -> bool {
        flow > 0 || vehicle_count > 0
    }

    /// Record one qualifying window. No-op once calibrated.
    pub fn observe(&mut self, flow: f64, density: f64, speed_variance: f64) {
        if self.stats.ready {
            return;
        }

        self.flow_samples.push(flow);
        self.density_samples.push(density);
        self.speed_variance_samples.push(speed_variance);
        self.stats.samples_seen += 1;

        debug!(
            "📐 Baseline sample {}/{}: flow={:.0}, density={:.4}, speed_var={:.1}",
            self.stats.samples_seen, self.window_size, flow, density, speed_variance
        );

        if self.stats.samples_seen >= self.window_size {
            self.calibrate();
        }
    }

    fn calibrate(&mut self) {
        let (flow_mean, flow_std) = mean_std(&self.flow_samples);
        let (density_mean, density_std) = mean_std(&self.density_samples);
        let (sv_mean, sv_std) = mean_std(&self.speed_variance_samples);

        self.stats.flow = MetricBaseline {
            mean: flow_mean.max(FLOW_MEAN_FLOOR),
            std: flow_std.max(FLOW_STD_FLOOR),
        };
        self.stats.density = MetricBaseline {
            mean: density_mean.max(DENSITY_MEAN_FLOOR),
            std: density_std.max(DENSITY_STD_FLOOR),
        };
        self.stats.speed_variance = MetricBaseline {
            mean: sv_mean,
            std: sv_std.max(SPEED_VARIANCE_STD_FLOOR),
        };
        self.stats.ready = true;

        // Samples are no longer needed once frozen
        self.flow_samples = Vec::new();
        self.density_samples = Vec::new();
        self.speed_variance_samples = Vec::new();

        info!("✅ Baseline calibrated after {} windows", self.stats.samples_seen);
        info!(
            "   Flow: {:.1}±{:.1} vehicles/window",
            self.stats.flow.mean, self.stats.flow.std
        );
        info!(
            "   Density: {:.4}±{:.4} vehicles/m²",
            self.stats.density.mean, self.stats.density.std
        );
        info!(
            "   Speed variance: {:.1}±{:.1}",
            self.stats.speed_variance.mean, self.stats.speed_variance.std
        );
    }

    pub fn stats(&self) -> &BaselineStats {
        &self.stats
    }

    pub fn is_ready(&self) -> bool {
        self.stats.ready
    }

    pub fn samples_seen(&self) -> usize {
        self.stats.samples_seen
    }

    pub fn status(&self) -> BaselineStatus {
        if self.stats.ready {
            BaselineStatus::Ready(self.stats)
        } else {
            BaselineStatus::Calibrating {
                samples_seen: self.stats.samples_seen,
                required: self.window_size,
            }
        }
    }
}

/// Population mean and standard deviation
fn mean_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
