pub mod danger;
pub mod error;
pub mod fusion;
pub mod map;
pub mod obstacle;
pub mod road;
pub mod utils;

pub use danger::{DangerRanker, DangerVerdict, DepartureRule, DepartureSignal, ObstacleHazard};
pub use error::{FusionError, InvalidInput, Result};
pub use fusion::{FrameFusion, FusionReport};
pub use map::{ClassMap, DepthMap, RoadClass};
pub use obstacle::{Detections, ObstacleClass, Zone, ZoneFlags};
pub use road::{RoadAggregator, RoadDistances};

/// Stored for a road class that never appeared in the frame. Real depths live in [0, 1].
pub const UNOBSERVED_DISTANCE: f32 = 100.0;

/// Rows and columns kept when reducing maps for per-class distances (every n-th).
pub const DEFAULT_DOWNSAMPLE: usize = 4;

// --- Current road crop ---
// The strip right in front of and beneath the user.
pub(crate) const CURRENT_ROAD_ROW_START: f64 = 0.75;
pub(crate) const CURRENT_ROAD_COL_START: f64 = 0.30;
pub(crate) const CURRENT_ROAD_COL_END: f64 = 0.65;

// --- Departure thresholds ---
/// Standing on the roadway with roadway pixels this close triggers the roadway signal.
pub const ROADWAY_DEPARTURE_DISTANCE: f32 = 0.15;
/// Standing on a crosswalk with crosswalk pixels this close triggers the crosswalk signal.
pub const CROSSWALK_DEPARTURE_DISTANCE: f32 = 0.2;
