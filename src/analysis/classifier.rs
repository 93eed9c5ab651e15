// src/analysis/classifier.rs
//
// Maps a scored window to a traffic state, severity and explanation.
//
// Rules are evaluated in fixed precedence, first match wins:
//   1. Gridlock override (count > 25 or density > 2× threshold)
//   2. tvsi < -0.5   → Critical Failure
//   3. tvsi < -0.2   → Moderate Congestion
//   4. tvsi <  0.0   → Light Congestion
//   5. tvsi <  0.3   → Stable Flow
//   6. otherwise     → Excellent
//
// Rule 1 ignores tvsi entirely.

use crate::types::{Severity, TrafficState};

const GRIDLOCK_COUNT: u32 = 25;
const GRIDLOCK_DENSITY_MULTIPLIER: f64 = 2.0;

/// Inputs the classifier cites when building explanations
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput {
    pub tvsi: f64,
    pub density: f64,
    pub avg_speed: f64,
    pub flow: u32,
    pub vehicle_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub state: TrafficState,
    pub severity: Severity,
    pub explanation: String,
}

pub fn classify(
    input: &ClassifierInput,
    density_threshold: f64,
    baseline_flow_mean: f64,
) -> Classification {
    let ClassifierInput {
        tvsi,
        density,
        avg_speed,
        flow,
        vehicle_count: count,
    } = *input;

    if count > GRIDLOCK_COUNT || density > density_threshold * GRIDLOCK_DENSITY_MULTIPLIER {
        return Classification {
            state: TrafficState::SevereCongestion,
            severity: Severity::Critical,
            explanation: format!(
                "🚨 GRIDLOCK: {} vehicles in ROI, density {:.4}/m²",
                count, density
            ),
        };
    }

    if tvsi < -0.5 {
        let mut reasons = Vec::new();
        if count > 18 {
            reasons.push(format!("{} vehicles (overcrowded)", count));
        }
        if flow < 3 {
            reasons.push(format!("flow collapse ({} veh/window)", flow));
        }
        if avg_speed < 15.0 {
            reasons.push(format!("gridlock speed ({:.0} km/h)", avg_speed));
        }
        return Classification {
            state: TrafficState::CriticalFailure,
            severity: Severity::Critical,
            explanation: format!(
                "🚨 CRITICAL: {}",
                join_or(&reasons, "immediate intervention needed")
            ),
        };
    }

    if tvsi < -0.2 {
        let mut reasons = Vec::new();
        if count > 12 {
            reasons.push(format!("{} vehicles", count));
        }
        if flow < 5 {
            reasons.push(format!("low flow ({} veh/window)", flow));
        }
        if avg_speed < 30.0 {
            reasons.push(format!("slow ({:.0} km/h)", avg_speed));
        }
        let severity = if tvsi < -0.35 {
            Severity::Severe
        } else {
            Severity::Warning
        };
        return Classification {
            state: TrafficState::ModerateCongestion,
            severity,
            explanation: format!("⚠️ CONGESTION: {}", join_or(&reasons, "traffic degrading")),
        };
    }

    if tvsi < 0.0 {
        let mut reasons = Vec::new();
        if count > 8 {
            reasons.push(format!("{} vehicles", count));
        }
        if avg_speed < 40.0 {
            reasons.push(format!("slower ({:.0} km/h)", avg_speed));
        }
        return Classification {
            state: TrafficState::LightCongestion,
            severity: Severity::Caution,
            explanation: format!("⚡ CAUTION: {}", join_or(&reasons, "minor slowdown")),
        };
    }

    if tvsi < 0.3 {
        return Classification {
            state: TrafficState::StableFlow,
            severity: Severity::Normal,
            explanation: format!(
                "✓ STABLE: {} vehicles, flow {}, {:.0} km/h",
                count, flow, avg_speed
            ),
        };
    }

    let mut reasons = Vec::new();
    if (flow as f64) >= baseline_flow_mean {
        reasons.push(format!("good flow ({} veh/window)", flow));
    }
    if avg_speed > 50.0 {
        reasons.push(format!("free flow ({:.0} km/h)", avg_speed));
    }
    if count < 8 {
        reasons.push(format!("low density ({} vehicles)", count));
    }
    Classification {
        state: TrafficState::Excellent,
        severity: Severity::Optimal,
        explanation: format!("✓✓ OPTIMAL: {}", join_or(&reasons, "excellent conditions")),
    }
}

fn join_or(reasons: &[String], fallback: &str) -> String {
    if reasons.is_empty() {
        fallback.to_string()
    } else {
        reasons.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.03;
    const FLOW_MEAN: f64 = 8.0;

    fn input(tvsi: f64, count: u32, flow: u32, avg_speed: f64) -> ClassifierInput {
        ClassifierInput {
            tvsi,
            density: count as f64 / 500.0,
            avg_speed,
            flow,
            vehicle_count: count,
        }
    }

    #[test]
    fn test_gridlock_overrides_positive_tvsi() {
        let c = classify(&input(0.9, 26, 20, 80.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(c.state, TrafficState::SevereCongestion);
        assert_eq!(c.severity, Severity::Critical);
        assert!(c.explanation.contains("26 vehicles"));
    }

    #[test]
    fn test_gridlock_from_density_alone() {
        let mut i = input(0.5, 5, 10, 60.0);
        i.density = 0.061;
        let c = classify(&i, THRESHOLD, FLOW_MEAN);
        assert_eq!(c.state, TrafficState::SevereCongestion);
    }

    #[test]
    fn test_critical_failure_reasons() {
        let c = classify(&input(-0.6, 20, 1, 10.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(c.state, TrafficState::CriticalFailure);
        assert_eq!(c.severity, Severity::Critical);
        assert!(c.explanation.contains("20 vehicles (overcrowded)"));
        assert!(c.explanation.contains("flow collapse (1 veh/window)"));
        assert!(c.explanation.contains("gridlock speed (10 km/h)"));
    }

    #[test]
    fn test_moderate_severity_split() {
        let severe = classify(&input(-0.4, 5, 10, 60.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(severe.state, TrafficState::ModerateCongestion);
        assert_eq!(severe.severity, Severity::Severe);
        assert_eq!(severe.explanation, "⚠️ CONGESTION: traffic degrading");

        let warning = classify(&input(-0.3, 5, 10, 60.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn test_boundaries() {
        let light = classify(&input(-0.2, 5, 10, 60.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(light.state, TrafficState::LightCongestion);
        assert_eq!(light.severity, Severity::Caution);

        let stable = classify(&input(0.0, 5, 10, 60.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(stable.state, TrafficState::StableFlow);
        assert_eq!(stable.explanation, "✓ STABLE: 5 vehicles, flow 10, 60 km/h");

        let excellent = classify(&input(0.3, 5, 10, 60.0), THRESHOLD, FLOW_MEAN);
        assert_eq!(excellent.state, TrafficState::Excellent);
        assert_eq!(excellent.severity, Severity::Optimal);
        assert!(excellent.explanation.contains("good flow (10 veh/window)"));
        assert!(excellent.explanation.contains("free flow (60 km/h)"));
        assert!(excellent.explanation.contains("low density (5 vehicles)"));
    }
}
