// src/recorder.rs
//
// JSON-lines sinks for scored windows and congestion alerts. Every line is
// flushed as soon as it is written so a crashed run keeps what it scored.

use crate::pipeline::WindowOutcome;
use crate::types::{CongestionEvent, ResultRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

impl ResultRecord {
    pub fn from_outcome(outcome: &WindowOutcome) -> Self {
        let result = &outcome.result;
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            frame: outcome.frame_id,
            tvsi: result.tvsi,
            state: result.state.as_str(),
            severity: result.severity.as_str(),
            trend: result.trend.as_str(),
            explanation: result.explanation.clone(),
            flow: outcome.summary.flow,
            density: result.components.raw_density,
            avg_speed: outcome.summary.avg_speed,
            congestion_detected: result.congestion_detected,
        }
    }
}

pub struct ResultRecorder {
    results: BufWriter<File>,
    congestion: BufWriter<File>,
    results_path: PathBuf,
    congestion_path: PathBuf,
    records_written: usize,
    events_written: usize,
}

impl ResultRecorder {
    /// Create `<stem>_tvsi.jsonl` and `<stem>_congestion.jsonl` in `output_dir`
    pub fn create(output_dir: &Path, stem: &str) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output dir {}", output_dir.display()))?;

        let results_path = output_dir.join(format!("{}_tvsi.jsonl", stem));
        let congestion_path = output_dir.join(format!("{}_congestion.jsonl", stem));

        let results = File::create(&results_path)
            .with_context(|| format!("creating {}", results_path.display()))?;
        let congestion = File::create(&congestion_path)
            .with_context(|| format!("creating {}", congestion_path.display()))?;

        Ok(Self {
            results: BufWriter::new(results),
            congestion: BufWriter::new(congestion),
            results_path,
            congestion_path,
            records_written: 0,
            events_written: 0,
        })
    }

    pub fn write_outcome(&mut self, outcome: &WindowOutcome) -> Result<()> {
        let record = ResultRecord::from_outcome(outcome);
        let json_line = serde_json::to_string(&record)?;
        writeln!(self.results, "{}", json_line)?;
        self.results.flush()?;
        self.records_written += 1;

        if let Some(event) = &outcome.alert {
            self.write_congestion(event)?;
        }
        Ok(())
    }

    fn write_congestion(&mut self, event: &CongestionEvent) -> Result<()> {
        let json_value = serde_json::json!({
            "type": "congestion",
            "logged_at": chrono::Utc::now().to_rfc3339(),
            "stream_time_s": event.timestamp_s,
            "state": event.state.as_str(),
            "vehicle_count": event.vehicle_count,
            "flow": event.flow,
            "density": event.density,
            "avg_speed": event.avg_speed,
        });

        let json_line = serde_json::to_string(&json_value)?;
        writeln!(self.congestion, "{}", json_line)?;
        self.congestion.flush()?;
        self.events_written += 1;
        info!("💾 Congestion event saved to JSONL");
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn events_written(&self) -> usize {
        self.events_written
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    pub fn congestion_path(&self) -> &Path {
        &self.congestion_path
    }
}
