//! Procedural street used by the demo binary and the pipeline tests.
//!
//! The user walks along a sidewalk and slowly drifts left onto the roadway.
//! A pole stands on the right, a car approaches on the left in the second half.

use crate::pipeline::{DepthEstimator, Detector, Frame, FrameSource, Segmenter};
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Array3};
use std::sync::Arc;
use watchout_fusion::utils::BoundingBox;
use watchout_fusion::{ClassMap, DepthMap, Detections, ObstacleClass, RoadClass};

pub const SCENE_WIDTH: usize = 160;
pub const SCENE_HEIGHT: usize = 120;

#[derive(Debug, Clone)]
pub struct StreetScene {
    frames: u64,
    /// Every n-th frame the depth estimator fails.
    fail_every: Option<u64>,
}

impl StreetScene {
    pub fn new(frames: u64, fail_every: Option<u64>) -> Self {
        Self {
            frames,
            fail_every: fail_every.filter(|&n| n > 0),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn source(self: &Arc<Self>) -> SceneSource {
        SceneSource {
            scene: self.clone(),
            next: 0,
        }
    }

    /// 0 at the first frame, 1 at the last.
    fn progress(&self, index: u64) -> f32 {
        let last = self.frames.saturating_sub(1).max(1);
        (index.min(last) as f32) / last as f32
    }

    fn road_at(&self, progress: f32, row: usize, col: usize) -> RoadClass {
        let kerb = SCENE_WIDTH as f32 * (0.15 + 0.55 * progress);
        if row < SCENE_HEIGHT / 4 {
            RoadClass::Background
        } else if (col as f32) < kerb {
            RoadClass::Roadway
        } else {
            RoadClass::Sidewalk
        }
    }

    /// Paints frame `index` in the road palette, so segmentation is a palette lookup.
    pub fn render(&self, index: u64) -> Frame {
        let progress = self.progress(index);
        let image = Array3::from_shape_fn((SCENE_HEIGHT, SCENE_WIDTH, 3), |(row, col, k)| {
            self.road_at(progress, row, col).palette_colour()[k]
        });
        Frame::new(index, image)
    }

    fn obstacles(&self, index: u64) -> Vec<(ObstacleClass, BoundingBox<f32>)> {
        let progress = self.progress(index);
        let mut obstacles = Vec::with_capacity(2);

        let pole_bottom = 50.0 + 45.0 * progress;
        obstacles.push((
            ObstacleClass::POLE,
            BoundingBox::from_xyxy(120.0, pole_bottom - 40.0, 128.0, pole_bottom),
        ));

        if progress >= 0.5 {
            let car_bottom = 70.0 + 90.0 * (progress - 0.5);
            obstacles.push((
                ObstacleClass::CAR,
                BoundingBox::from_xyxy(8.0, car_bottom - 30.0, 48.0, car_bottom),
            ));
        }
        obstacles
    }
}

impl Segmenter for StreetScene {
    fn segment(&self, frame: &Frame) -> Result<ClassMap> {
        ClassMap::from_palette(frame.image.view())
            .with_context(|| format!("Frame {} is not a palette image", frame.index))
    }
}

impl Detector for StreetScene {
    fn detect(&self, frame: &Frame) -> Result<Detections> {
        let mut detections = Detections::new((frame.width() as u32, frame.height() as u32));
        for (class, bbox) in self.obstacles(frame.index) {
            detections.push(class, bbox);
        }
        Ok(detections)
    }
}

impl DepthEstimator for StreetScene {
    fn estimate(&self, frame: &Frame) -> Result<DepthMap> {
        if let Some(n) = self.fail_every {
            if frame.index % n == n - 1 {
                bail!("depth model produced no output for frame {}", frame.index);
            }
        }

        let (height, width) = (frame.height(), frame.width());
        let bottom = height.saturating_sub(1).max(1) as f32;
        let depth = Array2::from_shape_fn((height, width), |(row, _)| 1.0 - row as f32 / bottom);
        Ok(DepthMap::new(depth)?)
    }
}

pub struct SceneSource {
    scene: Arc<StreetScene>,
    next: u64,
}

impl FrameSource for SceneSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.scene.frames {
            return Ok(None);
        }
        let frame = self.scene.render(self.next);
        self.next += 1;
        Ok(Some(frame))
    }
}
