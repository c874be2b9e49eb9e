pub mod category;
pub mod zone;

pub use category::{ObstacleCategory, ObstacleClass};
pub use zone::{lateral_zone, Zone, ZoneFlags};

use crate::error::{InvalidInput, Result};
use crate::map::DepthMap;
use crate::utils::graph::BoundingBox;
use crate::UNOBSERVED_DISTANCE;
use log::warn;
use rayon::prelude::*;

/// Output of the obstacle detector for one frame.
/// `classes[i]` and `boxes[i]` describe the same obstacle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub classes: Vec<ObstacleClass>,
    pub boxes: Vec<BoundingBox<f32>>,
    /// `(width, height)` of the frame the boxes refer to.
    pub frame_size: (u32, u32),
}

impl Detections {
    pub fn new(frame_size: (u32, u32)) -> Self {
        Self {
            frame_size,
            ..Default::default()
        }
    }

    pub fn push(&mut self, class: impl Into<ObstacleClass>, bbox: BoundingBox<f32>) {
        self.classes.push(class.into());
        self.boxes.push(bbox);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn check_aligned(&self) -> Result<()> {
        ensure_same_len("obstacle boxes", self.classes.len(), self.boxes.len())
    }
}

/// Nearest depth inside every obstacle box. Classes come back untouched and
/// `distances[i]` belongs to `classes[i]`.
pub fn obstacle_distances(
    classes: Vec<ObstacleClass>,
    boxes: &[BoundingBox<f32>],
    depth_map: &DepthMap,
) -> Result<(Vec<ObstacleClass>, Vec<f32>)> {
    ensure_same_len("obstacle boxes", classes.len(), boxes.len())?;

    let distances = boxes
        .par_iter()
        .map(|bbox| obstacle_distance(bbox, depth_map))
        .collect::<Vec<_>>();

    Ok((classes, distances))
}

/// Minimum depth of the depth map cropped to `bbox`.
/// A box that covers no pixel of the frame yields [`UNOBSERVED_DISTANCE`].
pub fn obstacle_distance(bbox: &BoundingBox<f32>, depth_map: &DepthMap) -> f32 {
    let (height, width) = depth_map.dim();
    let (rows, cols) = bbox.pixel_span(height, width);
    if rows.is_empty() || cols.is_empty() {
        warn!("Obstacle box {bbox:?} covers no pixel of the {width}x{height} depth map");
        return UNOBSERVED_DISTANCE;
    }

    depth_map
        .slice(ndarray::s![rows, cols])
        .fold(f32::INFINITY, |nearest, &depth| nearest.min(depth))
}

/// [`lateral_zone`] for every box, in input order.
pub fn lateral_zones(frame_width: u32, boxes: &[BoundingBox<f32>]) -> Vec<ZoneFlags> {
    boxes
        .iter()
        .map(|bbox| lateral_zone(frame_width as f64, bbox))
        .collect()
}

pub(crate) fn ensure_same_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InvalidInput::LengthMismatch {
            what,
            expected,
            actual,
        }
        .into())
    }
}
