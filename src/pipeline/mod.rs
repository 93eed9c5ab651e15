// src/pipeline/mod.rs

pub mod event_bus;
pub mod metrics;
pub mod orchestrator;

pub use event_bus::{EventBus, PipelineEvent};
pub use metrics::{MetricsSummary, PipelineMetrics};
pub use orchestrator::{PipelineOrchestrator, WindowOutcome};
