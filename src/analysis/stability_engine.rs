// src/analysis/stability_engine.rs
//
// Turns one window of traffic measurements into a bounded stability score.
//
// Signal flow per window:
//   speeds ─→ variance ─→ smoother ─┐
//   count  ─→ density ──────────────┼→ baseline (calibrating) ─→ z-scores
//   flow ───────────────────────────┘
//   z-scores + anomaly ─→ composite ─→ penalties/bonuses ─→ clip ─→ classify
//
// The engine owns its calibrator, smoother and history; nothing is shared
// between instances.

use super::baseline_calibrator::BaselineCalibrator;
use super::classifier::{classify, ClassifierInput};
use super::trend::TrendHistory;
use crate::smoother::{speed_variance, SpeedVarianceSmoother};
use crate::types::{EngineConfig, ScoreComponents, ScoreResult, WindowSummary};
use tracing::debug;

const Z_CLIP: f64 = 3.0;
const MIN_STD: f64 = 1e-6;

// Composite weights
const TFSI_WEIGHT: f64 = 0.5;
const SPEED_VARIANCE_WEIGHT: f64 = 0.25;
const ANOMALY_WEIGHT: f64 = 0.25;
const DENSITY_PENALTY_WEIGHT: f64 = 2.0;

const CONGESTION_PENALTY_EXPONENT: f64 = 1.5;
const CONGESTION_PENALTY_SCALE: f64 = 0.6;
const FLOW_BONUS: f64 = 0.15;
const CONSISTENCY_BONUS: f64 = 0.2;
const CONSISTENCY_MIN_SPEED_KMH: f64 = 40.0;
const CONSISTENCY_MAX_VARIANCE: f64 = 100.0;

pub struct StabilityEngine {
    config: EngineConfig,
    baseline: BaselineCalibrator,
    smoother: SpeedVarianceSmoother,
    history: TrendHistory,
    windows_scored: u64,
}

impl StabilityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            baseline: BaselineCalibrator::new(config.baseline_window_size),
            smoother: SpeedVarianceSmoother::new(config.speed_smoothing_window),
            history: TrendHistory::new(),
            windows_scored: 0,
            config,
        }
    }

    /// Score a completed window from the aggregator
    pub fn score_window(&mut self, summary: &WindowSummary, anomaly: f64) -> ScoreResult {
        self.compute(summary.flow, summary.vehicle_count(), &summary.speeds, anomaly)
    }

    /// Score one window of measurements.
    ///
    /// # Arguments
    /// * `flow` - Distinct objects that crossed the counting line in the window
    /// * `vehicle_count` - Average number of objects inside the ROI
    /// * `speeds` - Speed samples in km/h
    /// * `anomaly` - External anomaly signal, clipped to [0, 1]
    pub fn compute(
        &mut self,
        flow: u32,
        vehicle_count: u32,
        speeds: &[f64],
        anomaly: f64,
    ) -> ScoreResult {
        let threshold = self.config.congestion_density_threshold;

        let density = if self.config.roi_area_m2 > 0.0 {
            vehicle_count as f64 / self.config.roi_area_m2
        } else {
            0.0
        };

        let variance = speed_variance(speeds);
        let smoothed_variance = self.smoother.smooth(variance);

        let avg_speed = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };

        if !self.baseline.is_ready() && BaselineCalibrator::qualifies(flow, vehicle_count) {
            self.baseline.observe(flow as f64, density, smoothed_variance);
        }

        let stats = *self.baseline.stats();
        let norm_flow = normalize(flow as f64, stats.flow.mean, stats.flow.std);
        let norm_density = normalize(density, stats.density.mean, stats.density.std);
        let norm_speed_variance = normalize(
            smoothed_variance,
            stats.speed_variance.mean,
            stats.speed_variance.std,
        );
        let anomaly = if anomaly.is_nan() {
            0.0
        } else {
            anomaly.clamp(0.0, 1.0)
        };

        // Flow is rewarded, density penalized at double weight
        let tfsi = norm_flow - DENSITY_PENALTY_WEIGHT * norm_density;

        let mut raw = TFSI_WEIGHT * tfsi
            - SPEED_VARIANCE_WEIGHT * norm_speed_variance
            - ANOMALY_WEIGHT * anomaly;

        if threshold > 0.0 && density > threshold {
            let ratio = density / threshold;
            raw -= (ratio - 1.0).powf(CONGESTION_PENALTY_EXPONENT) * CONGESTION_PENALTY_SCALE;
        }

        if (flow as f64) > stats.flow.mean && density < threshold {
            raw += FLOW_BONUS;
        }

        if avg_speed > CONSISTENCY_MIN_SPEED_KMH
            && variance < CONSISTENCY_MAX_VARIANCE
            && density < threshold / 2.0
        {
            raw += CONSISTENCY_BONUS;
        }

        let tvsi = raw.clamp(-1.0, 1.0);

        let classification = classify(
            &ClassifierInput {
                tvsi,
                density,
                avg_speed,
                flow,
                vehicle_count,
            },
            threshold,
            stats.flow.mean,
        );

        self.history.record(tvsi, classification.state);
        let trend = self.history.trend();
        self.windows_scored += 1;

        debug!(
            "📊 Window {}: tvsi={:.3} tfsi={:.2} z(flow={:.2}, density={:.2}, speed_var={:.2}) → {}",
            self.windows_scored,
            tvsi,
            tfsi,
            norm_flow,
            norm_density,
            norm_speed_variance,
            classification.state.as_str()
        );

        ScoreResult {
            tvsi,
            state: classification.state,
            congestion_detected: classification.severity.is_congestion(),
            severity: classification.severity,
            explanation: classification.explanation,
            trend,
            components: ScoreComponents {
                tfsi,
                norm_flow,
                norm_density,
                norm_speed_variance,
                anomaly,
                raw_density: density,
                avg_speed,
                vehicle_count,
                speed_variance: variance,
                smoothed_speed_variance: smoothed_variance,
            },
            baseline: self.baseline.status(),
        }
    }

    pub fn baseline(&self) -> &BaselineCalibrator {
        &self.baseline
    }

    pub fn history(&self) -> &TrendHistory {
        &self.history
    }

    pub fn windows_scored(&self) -> u64 {
        self.windows_scored
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Z-score clipped to [-3, 3]; zero when the reference std is degenerate
fn normalize(value: f64, mean: f64, std: f64) -> f64 {
    if !(std >= MIN_STD) {
        return 0.0;
    }
    ((value - mean) / std).clamp(-Z_CLIP, Z_CLIP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaselineStatus, Severity, TrafficState, Trend};
    use proptest::prelude::*;

    fn engine() -> StabilityEngine {
        StabilityEngine::new(EngineConfig::default())
    }

    #[test]
    fn test_normalize_guards() {
        assert_eq!(normalize(5.0, 1.0, 0.0), 0.0);
        assert_eq!(normalize(5.0, 1.0, 1e-9), 0.0);
        assert_eq!(normalize(100.0, 0.0, 1.0), 3.0);
        assert_eq!(normalize(-100.0, 0.0, 1.0), -3.0);
        assert_eq!(normalize(2.0, 1.0, 2.0), 0.5);
    }

    #[test]
    fn test_precalibration_light_traffic_scores_high() {
        // Default priors: flow 8±3, density 0.015±0.008, speed var 80±30
        let mut engine = engine();
        let result = engine.compute(10, 5, &[50.0, 52.0, 48.0], 0.0);

        assert!(!result.baseline_ready());
        assert_eq!(
            result.baseline,
            BaselineStatus::Calibrating {
                samples_seen: 1,
                required: 5
            }
        );
        assert!(result.components.tfsi > 0.0);
        assert!((result.components.norm_flow - 2.0 / 3.0).abs() < 1e-9);
        assert!((result.components.norm_density + 0.625).abs() < 1e-9);
        // 0.5·1.9167 + 0.25·2.5778 + flow bonus + consistency bonus, clipped
        assert_eq!(result.tvsi, 1.0);
        assert_eq!(result.state, TrafficState::Excellent);
        assert_eq!(result.severity, Severity::Optimal);
        assert!(!result.congestion_detected);
    }

    #[test]
    fn test_gridlock_count_is_critical() {
        let mut engine = engine();
        let result = engine.compute(20, 30, &[90.0, 95.0, 92.0], 0.0);

        assert_eq!(result.state, TrafficState::SevereCongestion);
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.congestion_detected);
    }

    #[test]
    fn test_congestion_penalty_applies_above_threshold() {
        let mut engine = engine();
        // density 0.04 vs threshold 0.03, ratio 1.333
        let result = engine.compute(2, 20, &[10.0, 12.0, 8.0], 0.0);

        let c = result.components;
        let base = 0.5 * c.tfsi - 0.25 * c.norm_speed_variance - 0.25 * c.anomaly;
        let penalty = (0.04_f64 / 0.03 - 1.0).powf(1.5) * 0.6;
        assert!((result.tvsi - (base - penalty).clamp(-1.0, 1.0)).abs() < 1e-9);
        assert!(result.tvsi < 0.0);
    }

    #[test]
    fn test_empty_windows_never_calibrate() {
        let mut engine = engine();
        for _ in 0..5 {
            let result = engine.compute(0, 0, &[], 0.0);
            assert!(!result.baseline_ready());
        }
        assert_eq!(engine.baseline().samples_seen(), 0);
    }

    #[test]
    fn test_calibrates_after_qualifying_windows_only() {
        let mut engine = engine();
        let mut became_ready = Vec::new();

        for i in 0..12 {
            let (flow, count) = if i % 2 == 0 { (6, 4) } else { (0, 0) };
            let result = engine.compute(flow, count, &[60.0, 62.0], 0.0);
            became_ready.push(result.baseline_ready());
        }

        // Qualifying windows are 0,2,4,6,8; ready from the fifth onward
        let first_ready = became_ready.iter().position(|&r| r).unwrap();
        assert_eq!(first_ready, 8);
        assert!(became_ready[first_ready..].iter().all(|&r| r));
        assert_eq!(engine.baseline().samples_seen(), 5);
    }

    #[test]
    fn test_consistency_bonus_uses_current_window_variance() {
        let mut engine = engine();

        // Two erratic windows push the smoother far above the bonus limit
        for _ in 0..2 {
            let result = engine.compute(0, 2, &[10.0, 90.0, 50.0], 0.0);
            assert!(result.components.speed_variance > 1000.0);
        }

        // Steady 60 km/h window in light traffic (density 0.004)
        let result = engine.compute(0, 2, &[60.0, 62.0, 58.0], 0.0);
        let c = result.components;
        assert!(c.speed_variance < CONSISTENCY_MAX_VARIANCE);
        assert!(c.smoothed_speed_variance > CONSISTENCY_MAX_VARIANCE);
        assert!((c.smoothed_speed_variance - 712.0).abs() < 1e-9);

        // No flow bonus (0 < 8), so the only addition is the consistency bonus
        let base = 0.5 * c.tfsi - 0.25 * c.norm_speed_variance - 0.25 * c.anomaly;
        assert!((result.tvsi - (base + 0.2)).abs() < 1e-9);
        assert!((result.tvsi - (-0.5083333333333333)).abs() < 1e-9);
    }

    #[test]
    fn test_flow_bonus_follows_calibrated_mean() {
        let mut engine = engine();
        for _ in 0..5 {
            engine.compute(20, 5, &[], 0.0);
        }
        assert!(engine.baseline().is_ready());
        assert_eq!(engine.baseline().stats().flow.mean, 20.0);
        assert_eq!(engine.baseline().stats().flow.std, 2.0);

        // 19 beats the 8.0 prior but not the calibrated mean: no bonus
        let below = engine.compute(19, 5, &[], 0.0);
        assert!((below.components.norm_flow + 0.5).abs() < 1e-9);
        assert!((below.tvsi - (-0.25)).abs() < 1e-9);

        // 21 is above the calibrated mean: 0.5·0.5 + 0.15
        let above = engine.compute(21, 5, &[], 0.0);
        assert!((above.components.norm_flow - 0.5).abs() < 1e-9);
        assert!((above.tvsi - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_zero_roi_area_forces_zero_density() {
        let mut engine = StabilityEngine::new(EngineConfig {
            roi_area_m2: 0.0,
            ..EngineConfig::default()
        });
        let result = engine.compute(5, 40, &[], 0.0);
        assert_eq!(result.components.raw_density, 0.0);
        // Count alone still triggers the gridlock rule
        assert_eq!(result.state, TrafficState::SevereCongestion);
    }

    #[test]
    fn test_anomaly_clipped() {
        let mut engine = engine();
        let result = engine.compute(8, 7, &[], 4.2);
        assert_eq!(result.components.anomaly, 1.0);

        let result = engine.compute(8, 7, &[], -1.0);
        assert_eq!(result.components.anomaly, 0.0);
    }

    #[test]
    fn test_trend_tracks_history() {
        let mut engine = engine();
        let first = engine.compute(10, 5, &[50.0, 52.0, 48.0], 0.0);
        assert_eq!(first.trend, Trend::Stable);
        engine.compute(5, 12, &[30.0, 20.0, 25.0], 0.5);
        let third = engine.compute(1, 22, &[8.0, 6.0, 30.0], 1.0);
        assert_eq!(third.trend, Trend::Degrading);
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn test_replay_after_calibration_is_identical() {
        let cycle: [(u32, u32, Vec<f64>, f64); 3] = [
            (9, 6, vec![55.0, 60.0, 58.0], 0.0),
            (4, 14, vec![25.0, 30.0], 0.3),
            (12, 9, vec![70.0, 40.0, 65.0, 50.0], 0.1),
        ];
        let mut engine = engine();

        // Two cycles calibrate; the smoother and trend now hold one full cycle
        for _ in 0..2 {
            for (flow, count, speeds, anomaly) in &cycle {
                engine.compute(*flow, *count, speeds, *anomaly);
            }
        }
        assert!(engine.baseline().is_ready());

        let mut replay = || {
            cycle
                .iter()
                .map(|(flow, count, speeds, anomaly)| {
                    engine.compute(*flow, *count, speeds, *anomaly)
                })
                .collect::<Vec<_>>()
        };
        let first = replay();
        let second = replay();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn tvsi_always_bounded(
            windows in prop::collection::vec(
                (
                    0u32..60,
                    0u32..60,
                    prop::collection::vec(0.0f64..200.0, 0..20),
                    -2.0f64..3.0,
                ),
                1..30,
            )
        ) {
            let mut engine = engine();
            for (flow, count, speeds, anomaly) in &windows {
                let result = engine.compute(*flow, *count, speeds, *anomaly);
                prop_assert!(result.tvsi >= -1.0 && result.tvsi <= 1.0);
                prop_assert!(result.components.norm_flow.abs() <= 3.0);
                prop_assert!(result.components.norm_density.abs() <= 3.0);
                prop_assert!(result.components.norm_speed_variance.abs() <= 3.0);
                prop_assert!(engine.history().len() <= 100);
                if *count > 25 {
                    prop_assert_eq!(result.state, TrafficState::SevereCongestion);
                    prop_assert_eq!(result.severity, Severity::Critical);
                }
            }
        }

        #[test]
        fn compute_is_deterministic(
            windows in prop::collection::vec(
                (0u32..40, 0u32..40, prop::collection::vec(5.0f64..150.0, 0..10), 0.0f64..1.0),
                1..20,
            )
        ) {
            let mut a = engine();
            let mut b = engine();
            for (flow, count, speeds, anomaly) in &windows {
                prop_assert_eq!(
                    a.compute(*flow, *count, speeds, *anomaly),
                    b.compute(*flow, *count, speeds, *anomaly)
                );
            }
        }
    }
}
