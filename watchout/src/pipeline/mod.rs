pub mod perception;

pub use perception::{
    DepthEstimator, Detector, Frame, FrameSource, PendingPerception, Perception,
    PerceptionOutputs, Segmenter, Stage,
};

use crate::alert::{Alert, AlertSink};
use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::spawn_blocking;
use watchout_fusion::{Detections, FrameFusion, FusionError, FusionReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source:#}")]
    Perception {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
    #[error("{stage} stage missed its {timeout:?} deadline")]
    Timeout { stage: Stage, timeout: Duration },
    #[error("{stage} stage panicked or was cancelled")]
    Aborted { stage: Stage },
    #[error("fusion rejected the frame: {0}")]
    Fusion(#[from] FusionError),
}

impl PipelineError {
    /// Perception failures may succeed on a second attempt, bad fusion input will not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::Fusion(_))
    }
}

/// A fused frame together with the detections its verdict indexes into.
#[derive(Debug, Clone)]
pub struct FusedFrame {
    pub report: FusionReport,
    pub detections: Detections,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FrameStage {
    #[default]
    Idle,
    DispatchingPerception,
    Joining,
    Fusing,
    Alerting,
}

impl Display for FrameStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameStage::Idle => write!(f, "idle"),
            FrameStage::DispatchingPerception => write!(f, "dispatching perception"),
            FrameStage::Joining => write!(f, "joining"),
            FrameStage::Fusing => write!(f, "fusing"),
            FrameStage::Alerting => write!(f, "alerting"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub stage_timeout: Duration,
    pub retries: u32,
    pub alert_queue: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_millis(2000),
            retries: 0,
            alert_queue: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    pub fused: u64,
    pub dropped: u64,
    pub alerts: u64,
    pub alerts_dropped: u64,
    pub all_clear: u64,
}

impl Display for PipelineStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames: {} fused, {} dropped, {} alerts ({} not delivered), {} all clear",
            self.frames, self.fused, self.dropped, self.alerts, self.alerts_dropped, self.all_clear
        )
    }
}

/// Drives frames through perception, fusion and alerting, one frame at a time.
pub struct FrameOrchestrator {
    perception: Perception,
    fusion: FrameFusion,
    options: OrchestratorOptions,
    stage: FrameStage,
    stats: PipelineStats,
    /// Whether the sink has heard a verdict since the last all-clear it was sent.
    sink_alerted: bool,
}

impl FrameOrchestrator {
    pub fn new(perception: Perception, fusion: FrameFusion, options: OrchestratorOptions) -> Self {
        Self {
            perception,
            fusion,
            options,
            stage: FrameStage::Idle,
            stats: PipelineStats::default(),
            sink_alerted: false,
        }
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn fusion(&self) -> &FrameFusion {
        &self.fusion
    }

    fn enter(&mut self, stage: FrameStage) {
        debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Perceives and fuses one frame. An error means the frame is dropped.
    pub async fn process_frame(&mut self, frame: &Frame) -> Result<FusedFrame, PipelineError> {
        let start = Instant::now();
        let mut attempt = 0;

        let outputs = loop {
            self.enter(FrameStage::DispatchingPerception);
            let pending = self.perception.dispatch(frame);

            self.enter(FrameStage::Joining);
            match pending.join(self.options.stage_timeout).await {
                Ok(outputs) => break outputs,
                Err(e) if e.is_retryable() && attempt < self.options.retries => {
                    attempt += 1;
                    warn!(
                        "Frame {}: {e}, retrying ({attempt}/{})",
                        frame.index, self.options.retries
                    );
                }
                Err(e) => {
                    self.enter(FrameStage::Idle);
                    return Err(e);
                }
            }
        };

        self.enter(FrameStage::Fusing);
        let report = self.fusion.fuse(
            &outputs.class_map,
            &outputs.depth_map,
            &outputs.detections,
        );
        let report = match report {
            Ok(report) => report,
            Err(e) => {
                self.enter(FrameStage::Idle);
                return Err(e.into());
            }
        };
        debug!("Frame {} fused in {:?}", frame.index, start.elapsed());

        Ok(FusedFrame {
            report,
            detections: outputs.detections,
        })
    }

    /// Pulls frames from `source` until it runs dry or `shutdown` resolves.
    ///
    /// `source` is read on the blocking pool, one frame ahead of processing.
    /// Alerts go through a bounded channel to a separate task running `sink`;
    /// when that channel is full the alert is dropped instead of stalling frames.
    pub async fn run<S, F>(
        &mut self,
        source: S,
        sink: Arc<dyn AlertSink>,
        shutdown: F,
    ) -> anyhow::Result<PipelineStats>
    where
        S: FrameSource + 'static,
        F: Future<Output = ()>,
    {
        let (sender, mut receiver) = mpsc::channel::<Alert>(self.options.alert_queue.max(1));
        let alert_task = tokio::spawn(async move {
            while let Some(alert) = receiver.recv().await {
                let sink = sink.clone();
                let frame_index = alert.frame_index;
                match spawn_blocking(move || sink.alert(&alert)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Alert for frame {frame_index} failed: {e:#}"),
                    Err(e) => error!("Alert task for frame {frame_index} aborted: {e}"),
                }
            }
        });

        self.sink_alerted = false;
        let (frame_sender, mut frames) = mpsc::channel(1);
        let _reader = spawn_blocking(move || read_frames(source, frame_sender));

        tokio::pin!(shutdown);
        loop {
            let Some(next) = frames.recv().await else {
                info!("Frame source exhausted");
                break;
            };
            let frame = next.context("Failed to read next frame")?;
            self.stats.frames += 1;

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                result = self.process_frame(&frame) => Some(result),
            };

            let fused = match outcome {
                None => {
                    info!("Shutdown requested, abandoning frame {}", frame.index);
                    self.stats.dropped += 1;
                    self.enter(FrameStage::Idle);
                    break;
                }
                Some(Ok(fused)) => fused,
                Some(Err(e)) => {
                    match &e {
                        PipelineError::Fusion(_) => warn!("Dropping frame {}: {e}", frame.index),
                        _ => error!("Dropping frame {}: {e}", frame.index),
                    }
                    self.stats.dropped += 1;
                    continue;
                }
            };
            self.stats.fused += 1;

            self.enter(FrameStage::Alerting);
            self.dispatch(&sender, &frame, &fused)?;
            self.enter(FrameStage::Idle);
        }

        drop(frames);
        drop(sender);
        alert_task.await.context("Alert task failed")?;
        Ok(self.stats.clone())
    }

    fn dispatch(
        &mut self,
        sender: &mpsc::Sender<Alert>,
        frame: &Frame,
        fused: &FusedFrame,
    ) -> anyhow::Result<()> {
        let report = &fused.report;
        let Some(verdict) = &report.verdict else {
            debug!("Frame {}: all clear on {}", frame.index, report.current_road);
            self.stats.all_clear += 1;
            if self.sink_alerted {
                // lets the sink announce a returning hazard again
                let all_clear = Alert {
                    frame_index: frame.index,
                    current_road: report.current_road,
                    verdict: None,
                    bbox: None,
                };
                match sender.try_send(all_clear) {
                    Ok(()) => self.sink_alerted = false,
                    Err(TrySendError::Full(_)) => {
                        debug!("Alert queue full, all clear for frame {} deferred", frame.index)
                    }
                    Err(TrySendError::Closed(_)) => bail!("Alert task stopped"),
                }
            }
            return Ok(());
        };

        let bbox = verdict
            .as_obstacle()
            .and_then(|hazard| fused.detections.boxes.get(hazard.index).copied());
        let alert = Alert {
            frame_index: frame.index,
            current_road: report.current_road,
            verdict: Some(verdict.clone()),
            bbox,
        };

        match sender.try_send(alert) {
            Ok(()) => {
                self.stats.alerts += 1;
                self.sink_alerted = true;
            }
            Err(TrySendError::Full(alert)) => {
                warn!(
                    "Alert queue full, dropping alert for frame {}",
                    alert.frame_index
                );
                self.stats.alerts_dropped += 1;
            }
            Err(TrySendError::Closed(_)) => bail!("Alert task stopped"),
        }
        Ok(())
    }
}

fn read_frames<S: FrameSource>(mut source: S, frames: mpsc::Sender<anyhow::Result<Frame>>) {
    loop {
        let next = match source.next_frame() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => return,
            Err(e) => Err(e),
        };
        let failed = next.is_err();
        // a closed channel means the frame loop has stopped
        if frames.blocking_send(next).is_err() || failed {
            return;
        }
    }
}
