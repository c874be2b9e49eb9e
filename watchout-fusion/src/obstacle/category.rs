use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Category id reported by the obstacle detector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleClass(pub u32);

impl ObstacleClass {
    pub const PERSON: ObstacleClass = ObstacleClass(1);
    pub const POLE: ObstacleClass = ObstacleClass(2);
    pub const BOLLARD: ObstacleClass = ObstacleClass(3);
    pub const TREE_TRUNK: ObstacleClass = ObstacleClass(4);
    pub const CAR: ObstacleClass = ObstacleClass(5);
    pub const TRAFFIC_LIGHT: ObstacleClass = ObstacleClass(6);
    pub const TRUCK: ObstacleClass = ObstacleClass(7);
    pub const BUS: ObstacleClass = ObstacleClass(8);
    pub const TRAFFIC_SIGN: ObstacleClass = ObstacleClass(9);
    pub const MOTORCYCLE: ObstacleClass = ObstacleClass(10);
    pub const MOVABLE_SIGNAGE: ObstacleClass = ObstacleClass(11);
    pub const POTTED_PLANT: ObstacleClass = ObstacleClass(12);
    pub const WHEELCHAIR: ObstacleClass = ObstacleClass(13);

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "person",
            2 => "pole",
            3 => "bollard",
            4 => "tree trunk",
            5 => "car",
            6 => "traffic light",
            7 => "truck",
            8 => "bus",
            9 => "traffic sign",
            10 => "motorcycle",
            11 => "movable signage",
            12 => "potted plant",
            13 => "wheelchair",
            _ => "unknown obstacle",
        }
    }

    pub fn category(self) -> ObstacleCategory {
        match self {
            Self::CAR | Self::TRUCK | Self::BUS | Self::MOTORCYCLE => ObstacleCategory::Vehicle,
            Self::PERSON | Self::MOVABLE_SIGNAGE => ObstacleCategory::Mobile,
            _ => ObstacleCategory::Fixture,
        }
    }
}

impl From<u32> for ObstacleClass {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for ObstacleClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Danger row of an obstacle class; vehicles rank above people and movable
/// signage, which rank above everything fixed in place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleCategory {
    Vehicle = 0,
    Mobile = 1,
    Fixture = 2,
}

impl ObstacleCategory {
    pub fn tier(self) -> usize {
        self as usize
    }
}
