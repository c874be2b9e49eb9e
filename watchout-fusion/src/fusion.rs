use crate::danger::{DangerRanker, DangerVerdict};
use crate::error::Result;
use crate::map::{ClassMap, DepthMap, RoadClass};
use crate::obstacle::{lateral_zones, obstacle_distances, Detections, ZoneFlags};
use crate::road::{RoadAggregator, RoadDistances};
use crate::DEFAULT_DOWNSAMPLE;
use log::debug;
use std::time::Instant;

/// Everything fusion derived from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionReport {
    pub current_road: RoadClass,
    pub road_distances: RoadDistances,
    pub obstacle_distances: Vec<f32>,
    pub zones: Vec<ZoneFlags>,
    pub verdict: Option<DangerVerdict>,
}

/// Runs road aggregation, obstacle location and danger ranking over one
/// frame's perception outputs, in that order.
#[derive(Debug)]
pub struct FrameFusion {
    aggregator: RoadAggregator,
    ranker: DangerRanker,
    downsample: usize,
}

impl Default for FrameFusion {
    fn default() -> Self {
        Self::new(DangerRanker::default(), DEFAULT_DOWNSAMPLE)
    }
}

impl FrameFusion {
    pub fn new(ranker: DangerRanker, downsample: usize) -> Self {
        Self {
            aggregator: RoadAggregator::new(),
            ranker,
            downsample,
        }
    }

    /// Road the user was on after the last fused frame.
    pub fn user_road(&self) -> RoadClass {
        self.aggregator.user_road()
    }

    pub fn fuse(
        &self,
        class_map: &ClassMap,
        depth_map: &DepthMap,
        detections: &Detections,
    ) -> Result<FusionReport> {
        let start = Instant::now();
        detections.check_aligned()?;

        let road_distances =
            RoadAggregator::road_distances(class_map, depth_map, self.downsample)?;
        let current_road = self.aggregator.current_road(class_map);

        let (classes, obstacle_distances) =
            obstacle_distances(detections.classes.clone(), &detections.boxes, depth_map)?;
        let zones = lateral_zones(detections.frame_size.0, &detections.boxes);

        let verdict = self.ranker.rank_danger(
            &classes,
            &zones,
            &obstacle_distances,
            &road_distances,
            current_road,
        )?;
        debug!(
            "Fused {} obstacles on {current_road} in {:?}",
            classes.len(),
            start.elapsed()
        );

        Ok(FusionReport {
            current_road,
            road_distances,
            obstacle_distances,
            zones,
            verdict,
        })
    }
}
