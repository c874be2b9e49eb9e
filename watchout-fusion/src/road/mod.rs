pub mod distance;

pub use distance::RoadDistances;

use crate::error::{InvalidInput, Result};
use crate::map::{decimate, ClassMap, DepthMap, RoadClass};
use crate::{CURRENT_ROAD_COL_END, CURRENT_ROAD_COL_START, CURRENT_ROAD_ROW_START};
use log::debug;
use ndarray::{s, ArrayView2, Zip};
use parking_lot::RwLock;

/// Reduces the road segmentation of a frame to the road the user stands on and
/// the nearest depth of every road class.
///
/// The road the user occupies survives between frames; it starts out as
/// background and is overwritten by every [`RoadAggregator::current_road`] call.
#[derive(Debug, Default)]
pub struct RoadAggregator {
    user_road: RwLock<RoadClass>,
}

impl RoadAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Road class stored by the last [`RoadAggregator::current_road`] call.
    pub fn user_road(&self) -> RoadClass {
        *self.user_road.read()
    }

    /// Picks the dominant class in the bottom quarter, between 30% and 65% of the width.
    /// Ties go to the lower class index.
    pub fn current_road(&self, class_map: &ClassMap) -> RoadClass {
        let (height, width) = class_map.dim();
        let top = (height as f64 * CURRENT_ROAD_ROW_START) as usize;
        let left = (width as f64 * CURRENT_ROAD_COL_START) as usize;
        let right = (width as f64 * CURRENT_ROAD_COL_END) as usize;

        let crop = class_map.slice(s![top..height, left..right]);
        let counts = count_roads(crop);
        let road = first_max(&counts);
        debug!("Current road {road} from crop counts {counts:?}");

        *self.user_road.write() = road;
        road
    }

    /// Nearest depth per road class over both maps reduced by `downsample`.
    /// Classes that never appear keep [`crate::UNOBSERVED_DISTANCE`].
    pub fn road_distances(
        class_map: &ClassMap,
        depth_map: &DepthMap,
        downsample: usize,
    ) -> Result<RoadDistances> {
        if class_map.dim() != depth_map.dim() {
            return Err(InvalidInput::ShapeMismatch {
                class: class_map.dim(),
                depth: depth_map.dim(),
            }
            .into());
        }

        let classes = decimate(class_map.view(), downsample)?;
        let depths = decimate(depth_map.view(), downsample)?;

        let mut distances = RoadDistances::default();
        Zip::from(&classes)
            .and(&depths)
            .for_each(|&class, &depth| distances.observe(class, depth));

        Ok(distances)
    }
}

/// Pixel count per road class, indexed by class.
pub fn count_roads(classes: ArrayView2<'_, RoadClass>) -> [usize; RoadClass::COUNT] {
    let mut counts = [0; RoadClass::COUNT];
    for class in classes.iter() {
        counts[class.index()] += 1;
    }
    counts
}

fn first_max(counts: &[usize; RoadClass::COUNT]) -> RoadClass {
    let mut best = 0;
    for (index, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = index;
        }
    }
    RoadClass::ALL[best]
}
