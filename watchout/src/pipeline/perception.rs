use super::PipelineError;
use anyhow::Result;
use log::debug;
use ndarray::Array3;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{timeout_at, Instant};
use watchout_fusion::{ClassMap, DepthMap, Detections};

/// One RGB video frame, `(height, width, 3)`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Arc<Array3<u8>>,
}

impl Frame {
    pub fn new(index: u64, image: Array3<u8>) -> Self {
        Self {
            index,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> usize {
        self.image.dim().1
    }

    pub fn height(&self) -> usize {
        self.image.dim().0
    }
}

pub trait FrameSource: Send {
    /// `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

pub trait Segmenter: Send + Sync {
    /// Road class per pixel, same size as the frame.
    fn segment(&self, frame: &Frame) -> Result<ClassMap>;
}

pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Detections>;
}

pub trait DepthEstimator: Send + Sync {
    /// Relative depth per pixel, same size as the frame.
    fn estimate(&self, frame: &Frame) -> Result<DepthMap>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Segmentation,
    Detection,
    Depth,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Segmentation => write!(f, "segmentation"),
            Stage::Detection => write!(f, "detection"),
            Stage::Depth => write!(f, "depth"),
        }
    }
}

/// The three perception collaborators run against every frame.
#[derive(Clone)]
pub struct Perception {
    pub segmenter: Arc<dyn Segmenter>,
    pub detector: Arc<dyn Detector>,
    pub depth: Arc<dyn DepthEstimator>,
}

impl Perception {
    pub fn new(
        segmenter: Arc<dyn Segmenter>,
        detector: Arc<dyn Detector>,
        depth: Arc<dyn DepthEstimator>,
    ) -> Self {
        Self {
            segmenter,
            detector,
            depth,
        }
    }

    /// Starts all three stages on the blocking pool without waiting for them.
    pub fn dispatch(&self, frame: &Frame) -> PendingPerception {
        let segmenter = self.segmenter.clone();
        let input = frame.clone();
        let segmentation = spawn_blocking(move || segmenter.segment(&input));

        let detector = self.detector.clone();
        let input = frame.clone();
        let detection = spawn_blocking(move || detector.detect(&input));

        let estimator = self.depth.clone();
        let input = frame.clone();
        let depth = spawn_blocking(move || estimator.estimate(&input));

        PendingPerception {
            frame_index: frame.index,
            dispatched: Instant::now(),
            segmentation,
            detection,
            depth,
        }
    }
}

/// Perception stages in flight for one frame.
#[derive(Debug)]
pub struct PendingPerception {
    frame_index: u64,
    dispatched: Instant,
    segmentation: JoinHandle<Result<ClassMap>>,
    detection: JoinHandle<Result<Detections>>,
    depth: JoinHandle<Result<DepthMap>>,
}

impl PendingPerception {
    /// Waits for every stage. Each stage must finish within `timeout` of dispatch.
    ///
    /// The first failure wins; stages still running are detached and their
    /// results discarded.
    pub async fn join(self, timeout: Duration) -> Result<PerceptionOutputs, PipelineError> {
        let deadline = self.dispatched + timeout;
        let frame_index = self.frame_index;

        let (class_map, detections, depth_map) = futures::try_join!(
            await_stage(Stage::Segmentation, deadline, timeout, self.segmentation),
            await_stage(Stage::Detection, deadline, timeout, self.detection),
            await_stage(Stage::Depth, deadline, timeout, self.depth),
        )?;
        debug!(
            "Frame {frame_index} joined after {:?}",
            self.dispatched.elapsed()
        );

        Ok(PerceptionOutputs {
            class_map,
            detections,
            depth_map,
        })
    }
}

async fn await_stage<T>(
    stage: Stage,
    deadline: Instant,
    timeout: Duration,
    handle: JoinHandle<Result<T>>,
) -> Result<T, PipelineError> {
    match timeout_at(deadline, handle).await {
        Err(_) => Err(PipelineError::Timeout { stage, timeout }),
        Ok(Err(_)) => Err(PipelineError::Aborted { stage }),
        Ok(Ok(Err(source))) => Err(PipelineError::Perception { stage, source }),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

/// Frame-scoped results of all three stages, owned by the orchestrator until fusion.
#[derive(Debug, Clone)]
pub struct PerceptionOutputs {
    pub class_map: ClassMap,
    pub detections: Detections,
    pub depth_map: DepthMap,
}
