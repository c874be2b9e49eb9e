pub mod class_map;
pub mod depth_map;

pub use class_map::ClassMap;
pub use depth_map::DepthMap;

use crate::error::{InvalidInput, Result};
use ndarray::{s, ArrayView2, ArrayViewD, Ix2};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Road surface categories produced by the segmentation stage.
/// The discriminant is the index used by every per-class table.
#[repr(u8)]
#[derive(
    TryFromPrimitive,
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    #[default]
    Background = 0,
    BikeLane = 1,
    CautionZone = 2,
    Crosswalk = 3,
    GuideBlock = 4,
    Roadway = 5,
    Sidewalk = 6,
}

impl RoadClass {
    pub const COUNT: usize = 7;

    pub const ALL: [RoadClass; RoadClass::COUNT] = [
        RoadClass::Background,
        RoadClass::BikeLane,
        RoadClass::CautionZone,
        RoadClass::Crosswalk,
        RoadClass::GuideBlock,
        RoadClass::Roadway,
        RoadClass::Sidewalk,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Result<Self> {
        RoadClass::try_from(index)
            .map_err(|e| InvalidInput::UnknownRoadClass(e.number).into())
    }

    pub fn name(self) -> &'static str {
        match self {
            RoadClass::Background => "background",
            RoadClass::BikeLane => "bike lane",
            RoadClass::CautionZone => "caution zone",
            RoadClass::Crosswalk => "crosswalk",
            RoadClass::GuideBlock => "guide block",
            RoadClass::Roadway => "roadway",
            RoadClass::Sidewalk => "sidewalk",
        }
    }

    /// Colour the segmentation stage paints this class with.
    pub fn palette_colour(self) -> [u8; 3] {
        match self {
            RoadClass::Background => [0, 0, 0],
            RoadClass::BikeLane => [255, 128, 0],
            RoadClass::CautionZone => [255, 0, 0],
            RoadClass::Crosswalk => [255, 0, 255],
            RoadClass::GuideBlock => [255, 255, 0],
            RoadClass::Roadway => [0, 0, 255],
            RoadClass::Sidewalk => [0, 255, 0],
        }
    }

    pub fn from_palette_colour(colour: [u8; 3]) -> Option<Self> {
        RoadClass::ALL
            .into_iter()
            .find(|class| class.palette_colour() == colour)
    }
}

impl Display for RoadClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rejects anything that is not a plain 2-D grid.
pub(crate) fn ensure_2d<A>(map: ArrayViewD<'_, A>) -> Result<ArrayView2<'_, A>> {
    let ndim = map.ndim();
    map.into_dimensionality::<Ix2>()
        .map_err(|_| InvalidInput::Dimensionality(ndim).into())
}

/// Keeps every `factor`-th row and column, starting from the first.
///
/// Two maps of the same shape decimated with the same factor keep exactly the
/// same source pixels, so element `[i, j]` of either result comes from
/// `[i * factor, j * factor]` of its source.
pub fn decimate<A>(map: ArrayView2<'_, A>, factor: usize) -> Result<ArrayView2<'_, A>> {
    if factor == 0 {
        return Err(InvalidInput::ZeroDownsample.into());
    }
    let step = factor as isize;
    Ok(map.slice_move(s![..;step, ..;step]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array2, IxDyn};

    #[test]
    fn class_index_round_trip() {
        for (i, class) in RoadClass::ALL.into_iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(RoadClass::from_index(i as u8), Ok(class));
        }
        assert_eq!(
            RoadClass::from_index(7),
            Err(InvalidInput::UnknownRoadClass(7).into())
        );
    }

    #[test]
    fn palette_lookup() {
        assert_eq!(
            RoadClass::from_palette_colour([0, 255, 0]),
            Some(RoadClass::Sidewalk)
        );
        assert_eq!(RoadClass::from_palette_colour([1, 2, 3]), None);
    }

    #[test]
    fn decimate_keeps_matching_pixels() {
        let map = Array2::from_shape_fn((9, 7), |(r, c)| r * 100 + c);
        let small = decimate(map.view(), 3).unwrap();
        assert_eq!(small.dim(), (3, 3));
        for ((r, c), &v) in small.indexed_iter() {
            assert_eq!(v, map[[r * 3, c * 3]]);
        }
    }

    #[test]
    fn decimate_rejects_zero() {
        let map = Array2::<u8>::zeros((2, 2));
        assert!(decimate(map.view(), 0).is_err());
    }

    #[test]
    fn non_2d_rejected() {
        let cube = Array::<u8, _>::zeros(IxDyn(&[2, 2, 2]));
        assert_eq!(
            ensure_2d(cube.view()).unwrap_err(),
            InvalidInput::Dimensionality(3).into()
        );
    }
}
