use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.frame_rate <= 0.0 {
            bail!("engine.frame_rate must be positive (got {})", engine.frame_rate);
        }
        if engine.window_duration_sec <= 0.0 {
            bail!(
                "engine.window_duration_sec must be positive (got {})",
                engine.window_duration_sec
            );
        }
        if engine.baseline_window_size == 0 {
            bail!("engine.baseline_window_size must be at least 1");
        }
        if engine.speed_smoothing_window == 0 {
            bail!("engine.speed_smoothing_window must be at least 1");
        }
        let tracking = &self.tracking;
        if !(tracking.max_track_age_s >= 0.0) {
            bail!(
                "tracking.max_track_age_s must be non-negative (got {})",
                tracking.max_track_age_s
            );
        }
        Ok(())
    }
}
