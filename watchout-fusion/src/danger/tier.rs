use crate::obstacle::ObstacleClass;

/// Danger priority by (category tier, distance tier). Higher is more dangerous.
pub const TIER_TABLE: [[u8; 3]; 3] = [
    [9, 7, 5],
    [8, 6, 2],
    [4, 3, 1],
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DistanceTier {
    /// 0.0 to 0.3
    Near = 0,
    /// 0.4 to 0.7
    Mid = 1,
    /// Everything else, the 0.3..0.4 gap included.
    Far = 2,
}

impl DistanceTier {
    pub fn of(distance: f32) -> Self {
        if (0.0..=0.3).contains(&distance) {
            DistanceTier::Near
        } else if (0.4..=0.7).contains(&distance) {
            DistanceTier::Mid
        } else {
            DistanceTier::Far
        }
    }
}

pub fn priority(class: ObstacleClass, distance: f32) -> u8 {
    TIER_TABLE[class.category().tier()][DistanceTier::of(distance) as usize]
}

/// Floors a relative depth to one decimal; anything outside [0, 0.9) reads as 0.9.
pub fn quantize_distance(distance: f32) -> f32 {
    if (0.0..0.9).contains(&distance) {
        (distance * 10.0).floor() / 10.0
    } else {
        0.9
    }
}
