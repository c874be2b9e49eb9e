use anyhow::{bail, Result};
use ndarray::{Array2, Array3};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use watchout::pipeline::{
    DepthEstimator, Detector, Frame, FrameSource, OrchestratorOptions, Perception, Segmenter,
    Stage,
};
use watchout::scene::StreetScene;
use watchout::{Alert, AlertSink, FrameOrchestrator, FrameStage, LogAlertSink, PipelineError};
use watchout_fusion::utils::BoundingBox;
use watchout_fusion::{
    ClassMap, DangerVerdict, DepartureSignal, DepthMap, Detections, FrameFusion, ObstacleClass,
    RoadClass,
};

#[derive(Default)]
struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertSink for RecordingSink {
    fn alert(&self, alert: &Alert) -> Result<()> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

struct Frames {
    remaining: u64,
    next: u64,
}

impl Frames {
    fn new(count: u64) -> Self {
        Self {
            remaining: count,
            next: 0,
        }
    }
}

impl FrameSource for Frames {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.next += 1;
        Ok(Some(Frame::new(self.next - 1, Array3::zeros((8, 12, 3)))))
    }
}

/// 8x12 sidewalk, nearer towards the bottom, with whatever detections it is given.
struct Sidewalk {
    detections: Detections,
}

impl Sidewalk {
    fn empty() -> Self {
        Self {
            detections: Detections::new((12, 8)),
        }
    }
}

impl Segmenter for Sidewalk {
    fn segment(&self, _: &Frame) -> Result<ClassMap> {
        Ok(ClassMap::new(Array2::from_elem((8, 12), RoadClass::Sidewalk)))
    }
}

impl Detector for Sidewalk {
    fn detect(&self, _: &Frame) -> Result<Detections> {
        Ok(self.detections.clone())
    }
}

impl DepthEstimator for Sidewalk {
    fn estimate(&self, _: &Frame) -> Result<DepthMap> {
        Ok(DepthMap::new(Array2::from_shape_fn((8, 12), |(r, _)| {
            1.0 - r as f32 / 7.0
        }))?)
    }
}

struct SlowDepth(Duration);

impl DepthEstimator for SlowDepth {
    fn estimate(&self, _: &Frame) -> Result<DepthMap> {
        std::thread::sleep(self.0);
        Ok(DepthMap::new(Array2::zeros((8, 12)))?)
    }
}

/// Fails the first attempt on every frame.
#[derive(Default)]
struct FlakyDetector {
    calls: AtomicU32,
}

impl Detector for FlakyDetector {
    fn detect(&self, _: &Frame) -> Result<Detections> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            bail!("detector warming up");
        }
        Ok(Detections::new((12, 8)))
    }
}

/// Keeps every alert until the gate opens.
#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

struct GatedSink {
    gate: Arc<Gate>,
    delivered: Mutex<u64>,
}

impl AlertSink for GatedSink {
    fn alert(&self, _: &Alert) -> Result<()> {
        self.gate.wait();
        *self.delivered.lock() += 1;
        Ok(())
    }
}

/// Reports a person on every frame and opens `gate` once frame `open_at` is seen.
struct GateOpeningDetector {
    gate: Arc<Gate>,
    open_at: u64,
}

impl Detector for GateOpeningDetector {
    fn detect(&self, frame: &Frame) -> Result<Detections> {
        if frame.index == self.open_at {
            self.gate.open();
        }
        let mut detections = Detections::new((12, 8));
        detections.push(ObstacleClass::PERSON, BoundingBox::from_xyxy(5.0, 4.0, 7.0, 8.0));
        Ok(detections)
    }
}

/// A person on even frames, nothing on odd ones.
struct BlinkingDetector;

impl Detector for BlinkingDetector {
    fn detect(&self, frame: &Frame) -> Result<Detections> {
        let mut detections = Detections::new((12, 8));
        if frame.index % 2 == 0 {
            detections.push(ObstacleClass::PERSON, BoundingBox::from_xyxy(5.0, 4.0, 7.0, 8.0));
        }
        Ok(detections)
    }
}

struct PanickingDetector;

impl Detector for PanickingDetector {
    fn detect(&self, _: &Frame) -> Result<Detections> {
        panic!("detector crashed");
    }
}

/// Keeps what a [`LogAlertSink`] actually said.
#[derive(Default)]
struct AnnouncementLog {
    sink: LogAlertSink,
    said: Mutex<Vec<String>>,
}

impl AlertSink for AnnouncementLog {
    fn alert(&self, alert: &Alert) -> Result<()> {
        if let Some(text) = self.sink.announce(alert) {
            self.said.lock().push(text);
        }
        Ok(())
    }
}

fn sidewalk_perception(sidewalk: Sidewalk) -> Perception {
    let sidewalk = Arc::new(sidewalk);
    Perception::new(sidewalk.clone(), sidewalk.clone(), sidewalk)
}

fn options(stage_timeout: Duration, retries: u32) -> OrchestratorOptions {
    OrchestratorOptions {
        stage_timeout,
        retries,
        alert_queue: 64,
    }
}

#[tokio::test]
async fn street_scene_ends_in_roadway_departure() -> Result<()> {
    let scene = Arc::new(StreetScene::new(40, None));
    let perception = Perception::new(scene.clone(), scene.clone(), scene.clone());
    let mut orchestrator = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let sink = Arc::new(RecordingSink::default());

    let stats = orchestrator
        .run(scene.source(), sink.clone(), std::future::pending())
        .await?;

    assert_eq!(stats.frames, 40);
    assert_eq!(stats.fused, 40);
    assert_eq!(stats.dropped, 0);
    // the pole is always in view
    assert_eq!(stats.all_clear, 0);
    assert_eq!(stats.alerts, 40);
    assert_eq!(orchestrator.stage(), FrameStage::Idle);

    let alerts = sink.alerts.lock();
    assert_eq!(alerts.len(), 40);
    let first = alerts[0].verdict.as_ref().and_then(DangerVerdict::as_obstacle);
    assert_eq!(first.map(|hazard| hazard.class), Some(ObstacleClass::POLE));
    assert!(alerts[0].bbox.is_some());

    let last = &alerts[39];
    assert_eq!(last.current_road, RoadClass::Roadway);
    assert_eq!(
        last.verdict,
        Some(DangerVerdict::Departure(DepartureSignal::Roadway))
    );
    assert!(last.bbox.is_none());
    Ok(())
}

#[tokio::test]
async fn failed_stage_drops_only_that_frame() -> Result<()> {
    let scene = Arc::new(StreetScene::new(6, Some(2)));
    let perception = Perception::new(scene.clone(), scene.clone(), scene.clone());
    let mut orchestrator = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let sink = Arc::new(RecordingSink::default());

    let stats = orchestrator
        .run(scene.source(), sink.clone(), std::future::pending())
        .await?;

    assert_eq!(stats.frames, 6);
    assert_eq!(stats.dropped, 3);
    assert_eq!(stats.fused, 3);
    let delivered = sink
        .alerts
        .lock()
        .iter()
        .map(|alert| alert.frame_index)
        .collect::<Vec<_>>();
    assert_eq!(delivered, vec![0, 2, 4]);
    Ok(())
}

#[tokio::test]
async fn stage_past_its_deadline_drops_the_frame() {
    let sidewalk = Arc::new(Sidewalk::empty());
    let perception = Perception::new(
        sidewalk.clone(),
        sidewalk,
        Arc::new(SlowDepth(Duration::from_millis(200))),
    );
    let mut orchestrator = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_millis(20), 0),
    );

    let frame = Frame::new(0, Array3::zeros((8, 12, 3)));
    let result = orchestrator.process_frame(&frame).await;
    assert!(matches!(result, Err(PipelineError::Timeout { .. })));
    assert_eq!(orchestrator.stage(), FrameStage::Idle);
}

#[tokio::test]
async fn retries_recover_a_flaky_stage() -> Result<()> {
    let sidewalk = Arc::new(Sidewalk::empty());
    let perception = Perception::new(
        sidewalk.clone(),
        Arc::new(FlakyDetector::default()),
        sidewalk,
    );
    let mut orchestrator = FrameOrchestrator::new(
        perception.clone(),
        FrameFusion::default(),
        options(Duration::from_secs(5), 1),
    );
    let stats = orchestrator
        .run(
            Frames::new(3),
            Arc::new(RecordingSink::default()),
            std::future::pending(),
        )
        .await?;
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.fused, 3);

    let mut no_retry = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let frame = Frame::new(0, Array3::zeros((8, 12, 3)));
    assert!(matches!(
        no_retry.process_frame(&frame).await,
        Err(PipelineError::Perception { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn all_clear_frames_never_reach_the_sink() -> Result<()> {
    let mut orchestrator = FrameOrchestrator::new(
        sidewalk_perception(Sidewalk::empty()),
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let sink = Arc::new(RecordingSink::default());

    let stats = orchestrator
        .run(Frames::new(4), sink.clone(), std::future::pending())
        .await?;

    assert_eq!(stats.all_clear, 4);
    assert_eq!(stats.alerts, 0);
    assert!(sink.alerts.lock().is_empty());
    assert_eq!(orchestrator.fusion().user_road(), RoadClass::Sidewalk);
    Ok(())
}

#[tokio::test]
async fn obstacle_alert_carries_its_box() -> Result<()> {
    let mut detections = Detections::new((12, 8));
    let bbox = BoundingBox::from_xyxy(5.0, 4.0, 7.0, 8.0);
    detections.push(ObstacleClass::PERSON, bbox);

    let mut orchestrator = FrameOrchestrator::new(
        sidewalk_perception(Sidewalk { detections }),
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let sink = Arc::new(RecordingSink::default());
    orchestrator
        .run(Frames::new(1), sink.clone(), std::future::pending())
        .await?;

    let alerts = sink.alerts.lock();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].bbox, Some(bbox));
    let hazard = alerts[0]
        .verdict
        .as_ref()
        .and_then(DangerVerdict::as_obstacle)
        .cloned();
    assert_eq!(hazard.map(|h| (h.class, h.priority)), Some((ObstacleClass::PERSON, 8)));
    Ok(())
}

#[tokio::test]
async fn misaligned_detections_drop_the_frame() {
    let mut detections = Detections::new((12, 8));
    detections.classes.push(ObstacleClass::CAR);
    let mut orchestrator = FrameOrchestrator::new(
        sidewalk_perception(Sidewalk { detections }),
        FrameFusion::default(),
        options(Duration::from_secs(5), 3),
    );

    let frame = Frame::new(0, Array3::zeros((8, 12, 3)));
    let result = orchestrator.process_frame(&frame).await;
    assert!(matches!(result, Err(PipelineError::Fusion(_))));
}

#[tokio::test]
async fn shutdown_abandons_the_in_flight_frame() -> Result<()> {
    let mut orchestrator = FrameOrchestrator::new(
        sidewalk_perception(Sidewalk::empty()),
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let stats = orchestrator
        .run(
            Frames::new(10),
            Arc::new(RecordingSink::default()),
            std::future::ready(()),
        )
        .await?;

    assert_eq!(stats.frames, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.fused, 0);
    assert_eq!(orchestrator.stage(), FrameStage::Idle);
    Ok(())
}

#[tokio::test]
async fn returning_hazard_is_announced_again() -> Result<()> {
    let sidewalk = Arc::new(Sidewalk::empty());
    let perception = Perception::new(sidewalk.clone(), Arc::new(BlinkingDetector), sidewalk);
    let mut orchestrator = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );
    let log = Arc::new(AnnouncementLog::default());

    let stats = orchestrator
        .run(Frames::new(3), log.clone(), std::future::pending())
        .await?;

    assert_eq!(stats.alerts, 2);
    assert_eq!(stats.all_clear, 1);
    let said = log.said.lock();
    assert_eq!(said.len(), 2);
    assert_eq!(said[0], said[1]);
    Ok(())
}

#[tokio::test]
async fn full_alert_queue_drops_alerts_not_frames() -> Result<()> {
    let gate = Arc::new(Gate::default());
    let sidewalk = Arc::new(Sidewalk::empty());
    let detector = Arc::new(GateOpeningDetector {
        gate: gate.clone(),
        open_at: 4,
    });
    let mut orchestrator = FrameOrchestrator::new(
        Perception::new(sidewalk.clone(), detector, sidewalk),
        FrameFusion::default(),
        OrchestratorOptions {
            stage_timeout: Duration::from_secs(5),
            retries: 0,
            alert_queue: 1,
        },
    );
    let sink = Arc::new(GatedSink {
        gate,
        delivered: Mutex::new(0),
    });

    let stats = orchestrator
        .run(Frames::new(5), sink.clone(), std::future::pending())
        .await?;

    assert_eq!(stats.fused, 5);
    assert_eq!(stats.dropped, 0);
    assert!(stats.alerts_dropped >= 2, "{stats}");
    assert_eq!(stats.alerts + stats.alerts_dropped, 5);
    assert_eq!(*sink.delivered.lock(), stats.alerts);
    Ok(())
}

#[tokio::test]
async fn panicking_stage_is_reported_as_aborted() {
    let sidewalk = Arc::new(Sidewalk::empty());
    let perception = Perception::new(sidewalk.clone(), Arc::new(PanickingDetector), sidewalk);
    let mut orchestrator = FrameOrchestrator::new(
        perception,
        FrameFusion::default(),
        options(Duration::from_secs(5), 0),
    );

    let frame = Frame::new(0, Array3::zeros((8, 12, 3)));
    let result = orchestrator.process_frame(&frame).await;
    assert!(matches!(
        result,
        Err(PipelineError::Aborted {
            stage: Stage::Detection
        })
    ));
    assert_eq!(orchestrator.stage(), FrameStage::Idle);
}
