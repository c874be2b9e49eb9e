use crate::pipeline::OrchestratorOptions;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use watchout_fusion::{DangerRanker, DepartureRule, FrameFusion, DEFAULT_DOWNSAMPLE};

/// Runtime settings. Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Every n-th row and column is kept when computing road distances.
    pub downsample: usize,
    pub stage_timeout_ms: u64,
    pub perception_retries: u32,
    pub alert_queue: usize,
    /// Floor obstacle distances to one decimal before tiering.
    pub quantize_distance: bool,
    pub departure_rules: Vec<DepartureRule>,
    pub log_level: String,
    /// Length of the synthetic demo scene.
    pub frames: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downsample: DEFAULT_DOWNSAMPLE,
            stage_timeout_ms: 2000,
            perception_retries: 0,
            alert_queue: 8,
            quantize_distance: false,
            departure_rules: DepartureRule::defaults(),
            log_level: "info".to_string(),
            frames: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config JSON in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.downsample > 0, "downsample must be at least 1");
        ensure!(self.stage_timeout_ms > 0, "stage_timeout_ms must be positive");
        ensure!(self.alert_queue > 0, "alert_queue must be at least 1");
        for rule in &self.departure_rules {
            ensure!(
                (0.0..=1.0).contains(&rule.threshold),
                "departure threshold {} for {} is outside [0, 1]",
                rule.threshold,
                rule.signal
            );
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn fusion(&self) -> FrameFusion {
        let ranker = DangerRanker::new(self.departure_rules.clone(), self.quantize_distance);
        FrameFusion::new(ranker, self.downsample)
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            stage_timeout: self.stage_timeout(),
            retries: self.perception_retries,
            alert_queue: self.alert_queue,
        }
    }
}
