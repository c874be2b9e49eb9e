use crate::map::RoadClass;
use crate::road::RoadDistances;
use crate::{CROSSWALK_DEPARTURE_DISTANCE, ROADWAY_DEPARTURE_DISTANCE};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Road boundary the user has crossed. Outranks every obstacle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureSignal {
    Roadway,
    Crosswalk,
}

impl DepartureSignal {
    /// Negative code the alert side keys on, so it never collides with an obstacle class.
    pub fn code(self) -> i8 {
        match self {
            DepartureSignal::Roadway => -1,
            DepartureSignal::Crosswalk => -2,
        }
    }
}

impl Display for DepartureSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DepartureSignal::Roadway => write!(f, "roadway departure"),
            DepartureSignal::Crosswalk => write!(f, "crosswalk departure"),
        }
    }
}

/// Fires when the user stands on `on` and `watch` pixels are at most `threshold` away.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepartureRule {
    pub on: RoadClass,
    pub watch: RoadClass,
    pub threshold: f32,
    pub signal: DepartureSignal,
}

impl DepartureRule {
    pub const ROADWAY: DepartureRule = DepartureRule {
        on: RoadClass::Roadway,
        watch: RoadClass::Roadway,
        threshold: ROADWAY_DEPARTURE_DISTANCE,
        signal: DepartureSignal::Roadway,
    };

    pub const CROSSWALK: DepartureRule = DepartureRule {
        on: RoadClass::Crosswalk,
        watch: RoadClass::Crosswalk,
        threshold: CROSSWALK_DEPARTURE_DISTANCE,
        signal: DepartureSignal::Crosswalk,
    };

    /// Checked in this order; the first rule that fires wins.
    pub fn defaults() -> Vec<DepartureRule> {
        vec![DepartureRule::ROADWAY, DepartureRule::CROSSWALK]
    }

    pub fn fires(&self, current_road: RoadClass, road_distances: &RoadDistances) -> bool {
        current_road == self.on && road_distances[self.watch] <= self.threshold
    }
}
