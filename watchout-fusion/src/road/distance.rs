use crate::map::RoadClass;
use crate::UNOBSERVED_DISTANCE;
use std::fmt::{Display, Formatter};
use std::ops::Index;

/// Nearest relative depth seen for each road class, indexed by [`RoadClass`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadDistances([f32; RoadClass::COUNT]);

impl Default for RoadDistances {
    fn default() -> Self {
        Self([UNOBSERVED_DISTANCE; RoadClass::COUNT])
    }
}

impl From<[f32; RoadClass::COUNT]> for RoadDistances {
    fn from(distances: [f32; RoadClass::COUNT]) -> Self {
        Self(distances)
    }
}

impl Index<RoadClass> for RoadDistances {
    type Output = f32;

    fn index(&self, class: RoadClass) -> &Self::Output {
        &self.0[class.index()]
    }
}

impl RoadDistances {
    /// Keeps the smaller of the stored and the observed depth.
    pub fn observe(&mut self, class: RoadClass, depth: f32) {
        let slot = &mut self.0[class.index()];
        if *slot > depth {
            *slot = depth;
        }
    }

    /// Only replaces the entry for `class`; handy for building test fixtures.
    pub fn with(mut self, class: RoadClass, distance: f32) -> Self {
        self.0[class.index()] = distance;
        self
    }

    pub fn is_observed(&self, class: RoadClass) -> bool {
        self[class] != UNOBSERVED_DISTANCE
    }

    pub fn as_array(&self) -> &[f32; RoadClass::COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (RoadClass, f32)> + '_ {
        RoadClass::ALL.into_iter().zip(self.0.iter().copied())
    }
}

impl Display for RoadDistances {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let observed = self
            .iter()
            .filter(|(class, _)| self.is_observed(*class))
            .map(|(class, distance)| format!("{class}={distance:.2}"))
            .collect::<Vec<_>>();
        if observed.is_empty() {
            write!(f, "no road observed")
        } else {
            write!(f, "{}", observed.join(", "))
        }
    }
}
