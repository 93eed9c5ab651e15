// src/lib.rs
//
// Traffic Vital Stability Index (TVSI) engine.
//
// Signal flow:
//   Tracker output → tracking::ObservationBuilder ─┐
//   Prepared Observation ──────────────────────────┼→ WindowAggregator → StabilityEngine → AlertGate
//                                                  │
// Orchestrated by pipeline::PipelineOrchestrator; results persisted by recorder.
// Tracked input also raises per-vehicle overspeed alerts on the event bus.

pub mod alert_gate;
pub mod analysis;
pub mod config;
pub mod input;
pub mod pipeline;
pub mod recorder;
pub mod smoother;
pub mod tracking;
pub mod types;
pub mod window_aggregator;

pub use alert_gate::AlertGate;
pub use analysis::StabilityEngine;
pub use pipeline::{PipelineOrchestrator, WindowOutcome};
pub use types::{
    BaselineStats, BaselineStatus, Config, CongestionEvent, Observation, OverspeedEvent,
    ScoreResult, Severity, TrafficState, Trend, WindowSummary,
};
pub use window_aggregator::WindowAggregator;
