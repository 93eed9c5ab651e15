// src/main.rs

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{error, info, warn};
use traffic_stability::input::{load_frames_lenient, InputSource};
use traffic_stability::pipeline::{PipelineEvent, PipelineOrchestrator};
use traffic_stability::recorder::ResultRecorder;
use traffic_stability::types::Config;

#[derive(Parser, Debug)]
#[command(name = "traffic-stability", about = "Traffic Vital Stability Index engine")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration
    #[arg(long, env = "TVSI_CONFIG", default_value = "config.yaml")]
    config: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.as_str())
        .init();

    info!("🚦 Traffic Stability Index Engine Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Engine: window={:.1}s @ {:.1} fps, baseline windows={}, smoothing={}, alert interval={:.0}s",
        config.engine.window_duration_sec,
        config.engine.frame_rate,
        config.engine.baseline_window_size,
        config.engine.speed_smoothing_window,
        config.engine.alert_min_interval_sec
    );

    let source = InputSource::new(config.io.clone());
    let files = source.find_frame_files()?;

    if files.is_empty() {
        error!("No frame files found in {}", config.io.input_dir);
        return Ok(());
    }

    for (idx, path) in files.iter().enumerate() {
        info!("========================================");
        info!("Processing {}/{}: {}", idx + 1, files.len(), path.display());
        info!("========================================");

        match process_file(path, &config) {
            Ok(stats) => log_stats(&stats),
            Err(e) => error!("Failed to process {}: {:#}", path.display(), e),
        }
    }

    Ok(())
}

struct ProcessingStats {
    total_frames: u64,
    windows_scored: u64,
    congestion_windows: u64,
    alerts: usize,
    overspeed_alerts: u64,
    vehicles_counted: usize,
    avg_tvsi: Option<f64>,
    baseline_ready: bool,
    baseline_samples: usize,
    avg_fps: f64,
}

fn process_file(path: &Path, config: &Config) -> Result<ProcessingStats> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string());

    let mut pipeline = PipelineOrchestrator::new(config);
    let mut recorder = ResultRecorder::create(Path::new(&config.io.output_dir), &stem)?;

    for frame in load_frames_lenient(path)? {
        if let Some(outcome) = pipeline.process_input(&frame) {
            recorder.write_outcome(&outcome)?;
        }
        for event in pipeline.drain_events() {
            log_event(&event);
        }
    }

    let summary = pipeline.metrics().summary();
    let engine = pipeline.engine();

    info!("✅ Results: {}", recorder.results_path().display());
    if recorder.events_written() > 0 {
        info!("✅ Congestion events: {}", recorder.congestion_path().display());
    }

    Ok(ProcessingStats {
        total_frames: summary.total_frames,
        windows_scored: summary.windows_scored,
        congestion_windows: summary.congestion_windows,
        alerts: pipeline.alerts().len(),
        overspeed_alerts: summary.overspeed_alerts,
        vehicles_counted: pipeline.total_crossings(),
        avg_tvsi: engine.history().mean_tvsi(),
        baseline_ready: engine.baseline().is_ready(),
        baseline_samples: engine.baseline().samples_seen(),
        avg_fps: summary.fps,
    })
}

fn log_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::BaselineCalibrated {
            frame_id,
            windows_scored,
        } => info!(
            "📐 Baseline calibrated at frame {} after {} windows",
            frame_id, windows_scored
        ),
        PipelineEvent::CongestionAlert(alert) => info!(
            "📣 Congestion alert published at stream time {:.1}s ({})",
            alert.timestamp_s,
            alert.state.as_str()
        ),
        // Already logged by the orchestrator and written by the recorder
        PipelineEvent::WindowScored { .. } | PipelineEvent::OverspeedAlert(_) => {}
    }
}

fn log_stats(stats: &ProcessingStats) {
    info!("📊 PROCESSING SUMMARY");
    info!("  Frames: {}", stats.total_frames);
    info!("  Windows scored: {}", stats.windows_scored);
    info!("  🚗 Vehicles counted at line: {}", stats.vehicles_counted);

    if stats.baseline_ready {
        info!("  📐 Baseline: calibrated");
    } else {
        warn!(
            "  📐 Baseline: still calibrating ({} qualifying windows)",
            stats.baseline_samples
        );
    }

    if let Some(avg) = stats.avg_tvsi {
        info!("  🧠 Average TVSI (recent history): {:.3}", avg);
    }

    if stats.alerts > 0 {
        warn!(
            "  🚨 Congestion alerts: {} ({} congested windows)",
            stats.alerts, stats.congestion_windows
        );
    } else {
        info!("  🚨 Congestion alerts: 0");
    }

    if stats.overspeed_alerts > 0 {
        warn!("  🏎️  Overspeed alerts: {}", stats.overspeed_alerts);
    }

    info!("  Processing Speed: {:.1} FPS", stats.avg_fps);
}
