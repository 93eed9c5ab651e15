// src/analysis/mod.rs
//
// Window scoring modules.
//
// Signal flow:
//   WindowSummary → stability_engine ─┬→ baseline_calibrator (until frozen)
//                                     ├→ classifier → state / severity / explanation
//                                     └→ trend      → Improving / Degrading / Stable

pub mod baseline_calibrator;
pub mod classifier;
pub mod stability_engine;
pub mod trend;

pub use baseline_calibrator::BaselineCalibrator;
pub use classifier::{classify, Classification, ClassifierInput};
pub use stability_engine::StabilityEngine;
pub use trend::{TrendHistory, HISTORY_CAPACITY};
