pub mod departure;
pub mod tier;

pub use departure::{DepartureRule, DepartureSignal};
pub use tier::{priority, quantize_distance, DistanceTier, TIER_TABLE};

use crate::error::Result;
use crate::map::RoadClass;
use crate::obstacle::{ensure_same_len, ObstacleClass, ZoneFlags};
use crate::road::RoadDistances;
use log::debug;
use std::fmt::{Display, Formatter};

/// The single most dangerous thing in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DangerVerdict {
    Departure(DepartureSignal),
    Obstacle(ObstacleHazard),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleHazard {
    /// Position in the frame's obstacle list, used to recover the original box.
    pub index: usize,
    pub class: ObstacleClass,
    pub zone: ZoneFlags,
    pub distance: f32,
    /// Tier the priority was read from, after any quantisation.
    pub tier: DistanceTier,
    pub priority: u8,
}

impl DangerVerdict {
    /// Departure codes are negative; obstacles report their class id.
    pub fn code(&self) -> i64 {
        match self {
            DangerVerdict::Departure(signal) => signal.code() as i64,
            DangerVerdict::Obstacle(hazard) => hazard.class.0 as i64,
        }
    }

    pub fn as_obstacle(&self) -> Option<&ObstacleHazard> {
        match self {
            DangerVerdict::Obstacle(hazard) => Some(hazard),
            DangerVerdict::Departure(_) => None,
        }
    }
}

impl Display for DangerVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DangerVerdict::Departure(signal) => write!(f, "{signal}"),
            DangerVerdict::Obstacle(hazard) => write!(
                f,
                "{} ({}, distance {:.2}, priority {})",
                hazard.class, hazard.zone, hazard.distance, hazard.priority
            ),
        }
    }
}

/// Turns the fused frame state into at most one verdict.
///
/// Departure rules are checked first, in order. Without a departure, every
/// obstacle gets its [`TIER_TABLE`] priority and the first obstacle holding the
/// highest priority wins.
#[derive(Debug, Clone)]
pub struct DangerRanker {
    rules: Vec<DepartureRule>,
    quantize: bool,
}

impl Default for DangerRanker {
    fn default() -> Self {
        Self::new(DepartureRule::defaults(), false)
    }
}

impl DangerRanker {
    pub fn new(rules: Vec<DepartureRule>, quantize: bool) -> Self {
        Self { rules, quantize }
    }

    pub fn rules(&self) -> &[DepartureRule] {
        &self.rules
    }

    pub fn tier(&self, distance: f32) -> DistanceTier {
        if self.quantize {
            DistanceTier::of(quantize_distance(distance))
        } else {
            DistanceTier::of(distance)
        }
    }

    pub fn priority(&self, class: ObstacleClass, distance: f32) -> u8 {
        TIER_TABLE[class.category().tier()][self.tier(distance) as usize]
    }

    /// `classes`, `zones` and `distances` are index-aligned per obstacle.
    /// `Ok(None)` means the frame is all clear.
    pub fn rank_danger(
        &self,
        classes: &[ObstacleClass],
        zones: &[ZoneFlags],
        distances: &[f32],
        road_distances: &RoadDistances,
        current_road: RoadClass,
    ) -> Result<Option<DangerVerdict>> {
        ensure_same_len("obstacle zones", classes.len(), zones.len())?;
        ensure_same_len("obstacle distances", classes.len(), distances.len())?;

        if let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.fires(current_road, road_distances))
        {
            debug!(
                "{} on {current_road}: {} at {:.2}",
                rule.signal, rule.watch, road_distances[rule.watch]
            );
            return Ok(Some(DangerVerdict::Departure(rule.signal)));
        }

        let mut worst: Option<ObstacleHazard> = None;
        for (index, (&class, &distance)) in classes.iter().zip(distances).enumerate() {
            let tier = self.tier(distance);
            let priority = TIER_TABLE[class.category().tier()][tier as usize];
            if worst.as_ref().map_or(true, |w| priority > w.priority) {
                worst = Some(ObstacleHazard {
                    index,
                    class,
                    zone: zones[index],
                    distance,
                    tier,
                    priority,
                });
            }
        }

        Ok(worst.map(DangerVerdict::Obstacle))
    }
}
