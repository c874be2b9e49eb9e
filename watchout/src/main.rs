#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use watchout::pipeline::Perception;
use watchout::scene::StreetScene;
use watchout::{log_init, Config, FrameOrchestrator, LogAlertSink};

/// Danger fusion over a synthetic street scene.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file; defaults are used for missing fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to generate.
    #[arg(short, long)]
    frames: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,

    /// Make the depth stage fail on every n-th frame.
    #[arg(long)]
    fail_every: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(frames) = args.frames {
        config.frames = frames;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.validate()?;
    log_init(&config.log_level)?;

    let scene = Arc::new(StreetScene::new(config.frames, args.fail_every));
    let perception = Perception::new(scene.clone(), scene.clone(), scene.clone());
    let mut orchestrator =
        FrameOrchestrator::new(perception, config.fusion(), config.orchestrator_options());

    info!("Running {} frames", scene.frames());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let stats = orchestrator
        .run(scene.source(), Arc::new(LogAlertSink::new()), shutdown)
        .await?;

    info!("{stats}");
    Ok(())
}
