pub mod alert;
pub mod config;
pub mod pipeline;
pub mod scene;

pub use alert::{Alert, AlertSink, LogAlertSink};
pub use config::Config;
pub use pipeline::{FrameOrchestrator, FrameStage, PipelineError, PipelineStats};

use anyhow::{anyhow, Context, Result};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Installs the fmt subscriber; `log` records are forwarded to it.
pub fn log_init(level: &str) -> Result<()> {
    let level = LevelFilter::from_str(level)
        .with_context(|| format!("Unknown log level {level:?}"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))
}
