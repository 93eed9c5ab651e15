use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub tracking: TrackingConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub baseline_window_size: usize,
    pub roi_area_m2: f64,
    pub speed_smoothing_window: usize,
    pub congestion_density_threshold: f64,
    pub window_duration_sec: f64,
    pub frame_rate: f64,
    pub alert_min_interval_sec: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline_window_size: 5,
            roi_area_m2: 500.0,
            speed_smoothing_window: 3,
            congestion_density_threshold: 0.03, // 15 vehicles in a 500 m² ROI
            window_duration_sec: 5.0,
            frame_rate: 30.0,
            alert_min_interval_sec: 30.0,
        }
    }
}

impl EngineConfig {
    /// Frames per aggregation window, rounded down (never zero)
    pub fn frames_per_window(&self) -> usize {
        ((self.window_duration_sec * self.frame_rate).floor() as usize).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub pixel_to_meter: f64,
    pub line_y: f64,
    pub history_len: usize,
    pub min_speed_kmh: f64,
    pub max_speed_kmh: f64,
    /// Per-vehicle overspeed alert threshold
    pub speed_limit_kmh: f64,
    /// Tracks not seen for this long are forgotten
    pub max_track_age_s: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            pixel_to_meter: 0.05,
            line_y: 400.0,
            history_len: 10,
            min_speed_kmh: 5.0,
            max_speed_kmh: 150.0,
            speed_limit_kmh: 60.0,
            max_track_age_s: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub max_pending_events: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: "data/input".to_string(),
            output_dir: "data/output".to_string(),
            max_pending_events: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "traffic_stability=info".to_string(),
        }
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// One frame of already-digested measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Objects currently inside the region of interest
    pub count: u32,
    /// Speed estimates in km/h
    #[serde(default)]
    pub speeds: Vec<f64>,
    /// Identifiers that newly crossed the counting line this frame
    #[serde(default)]
    pub crossed_ids: BTreeSet<u64>,
}

/// Tracker output for a single object on one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: u64,
    /// Bottom-center x in pixels
    pub cx: f64,
    /// Bottom-center y in pixels
    pub cy: f64,
}

// Unknown keys are rejected so an observation line carrying a timestamp
// falls through to `FrameInput::Observed` instead of parsing as an empty frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackedFrame {
    pub timestamp_s: f64,
    #[serde(default)]
    pub objects: Vec<TrackedObject>,
    #[serde(default)]
    pub anomaly: f64,
}

/// A line of an input file: either raw tracks or a prepared observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameInput {
    Tracked(TrackedFrame),
    Observed {
        #[serde(flatten)]
        observation: Observation,
        #[serde(default)]
        anomaly: f64,
    },
}

// ============================================================================
// WINDOW / SCORE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub frames: usize,
    pub flow: u32,
    pub avg_count: f64,
    pub speeds: Vec<f64>,
    pub avg_speed: f64,
}

impl WindowSummary {
    /// Integer in-ROI count handed to the engine (mean truncated toward zero)
    pub fn vehicle_count(&self) -> u32 {
        self.avg_count.max(0.0).floor() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrafficState {
    SevereCongestion,
    CriticalFailure,
    ModerateCongestion,
    LightCongestion,
    StableFlow,
    Excellent,
}

impl TrafficState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevereCongestion => "Severe Congestion",
            Self::CriticalFailure => "Critical Failure",
            Self::ModerateCongestion => "Moderate Congestion",
            Self::LightCongestion => "Light Congestion",
            Self::StableFlow => "Stable Flow",
            Self::Excellent => "Excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Severe,
    Warning,
    Caution,
    Normal,
    Optimal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Severe => "SEVERE",
            Self::Warning => "WARNING",
            Self::Caution => "CAUTION",
            Self::Normal => "NORMAL",
            Self::Optimal => "OPTIMAL",
        }
    }

    pub fn is_congestion(&self) -> bool {
        matches!(self, Self::Critical | Self::Severe)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Optimal => "✓✓",
            Self::Normal => "✓",
            Self::Caution => "⚡",
            Self::Warning => "⚠",
            Self::Severe => "⚠⚠",
            Self::Critical => "🚨",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "IMPROVING",
            Self::Degrading => "DEGRADING",
            Self::Stable => "STABLE",
        }
    }
}

/// Reference distribution of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBaseline {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineStats {
    pub flow: MetricBaseline,
    pub density: MetricBaseline,
    pub speed_variance: MetricBaseline,
    pub ready: bool,
    pub samples_seen: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineStatus {
    Calibrating { samples_seen: usize, required: usize },
    Ready(BaselineStats),
}

/// Normalized sub-scores and raw inputs behind a tvsi value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub tfsi: f64,
    pub norm_flow: f64,
    pub norm_density: f64,
    pub norm_speed_variance: f64,
    pub anomaly: f64,
    pub raw_density: f64,
    pub avg_speed: f64,
    pub vehicle_count: u32,
    pub speed_variance: f64,
    pub smoothed_speed_variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub tvsi: f64,
    pub state: TrafficState,
    pub severity: Severity,
    pub explanation: String,
    pub trend: Trend,
    pub components: ScoreComponents,
    pub baseline: BaselineStatus,
    pub congestion_detected: bool,
}

impl ScoreResult {
    pub fn baseline_ready(&self) -> bool {
        matches!(self.baseline, BaselineStatus::Ready(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionEvent {
    /// Stream time in seconds when the alert fired
    pub timestamp_s: f64,
    pub flow: u32,
    pub density: f64,
    pub avg_speed: f64,
    pub state: TrafficState,
    pub vehicle_count: u32,
}

/// A single vehicle seen above the speed limit (fired once per track)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverspeedEvent {
    pub track_id: u64,
    pub speed_kmh: f64,
    /// Tracker timestamp of the frame that triggered the alert
    pub timestamp_s: f64,
}

/// Flat row written by the result recorder
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub timestamp: String,
    pub frame: u64,
    pub tvsi: f64,
    pub state: &'static str,
    pub severity: &'static str,
    pub trend: &'static str,
    pub explanation: String,
    pub flow: u32,
    pub density: f64,
    pub avg_speed: f64,
    pub congestion_detected: bool,
}
