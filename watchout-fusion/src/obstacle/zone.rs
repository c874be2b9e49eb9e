use crate::utils::graph::BoundingBox;
use bitvec::prelude::*;
use num::{Num, ToPrimitive};
use std::fmt::{Debug, Display, Formatter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Left = 0,
    Center = 1,
    Right = 2,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Left, Zone::Center, Zone::Right];

    /// Third of the frame width `x` falls in.
    pub fn of(x: f64, frame_width: f64) -> Zone {
        if x < frame_width / 3.0 {
            Zone::Left
        } else if x < frame_width * 2.0 / 3.0 {
            Zone::Center
        } else {
            Zone::Right
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Zone::Left => "left",
            Zone::Center => "center",
            Zone::Right => "right",
        }
    }
}

/// Which thirds of the frame an obstacle covers, as (left, center, right).
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ZoneFlags(BitArray<[u8; 1], Lsb0>);

impl Default for ZoneFlags {
    fn default() -> Self {
        Self(BitArray::ZERO)
    }
}

impl ZoneFlags {
    pub fn new(left: bool, center: bool, right: bool) -> Self {
        let mut flags = Self::default();
        for (zone, on) in Zone::ALL.into_iter().zip([left, center, right]) {
            if on {
                flags.insert(zone);
            }
        }
        flags
    }

    pub fn insert(&mut self, zone: Zone) {
        self.0.set(zone as usize, true);
    }

    pub fn contains(&self, zone: Zone) -> bool {
        self.0[zone as usize]
    }

    pub fn left(&self) -> bool {
        self.contains(Zone::Left)
    }

    pub fn center(&self) -> bool {
        self.contains(Zone::Center)
    }

    pub fn right(&self) -> bool {
        self.contains(Zone::Right)
    }

    pub fn is_empty(&self) -> bool {
        self.0.not_any()
    }

    pub fn as_tuple(&self) -> (bool, bool, bool) {
        (self.left(), self.center(), self.right())
    }

    pub fn zones(&self) -> impl Iterator<Item = Zone> + '_ {
        Zone::ALL.into_iter().filter(|zone| self.contains(*zone))
    }
}

impl Debug for ZoneFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (left, center, right) = self.as_tuple();
        f.debug_struct("ZoneFlags")
            .field("left", &left)
            .field("center", &center)
            .field("right", &right)
            .finish()
    }
}

impl Display for ZoneFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = self.zones().map(Zone::name).collect::<Vec<_>>();
        match names.as_slice() {
            [] => write!(f, "unknown side"),
            [only] => write!(f, "{only}"),
            [first, second] => write!(f, "{first} to {second}"),
            _ => write!(f, "across the whole path"),
        }
    }
}

/// Thirds of a `frame_width` wide frame covered by `bbox`.
///
/// The left edge decides the first zone; a left edge already in the right
/// third ends the evaluation there. Otherwise the right edge may add the
/// center or right third. A box reaching from the left third into the right
/// third also covers the center, so flags always form one contiguous run.
pub fn lateral_zone<T>(frame_width: f64, bbox: &BoundingBox<T>) -> ZoneFlags
where
    T: Num + Copy + ToPrimitive,
{
    let left_edge = bbox.left().to_f64().unwrap_or(0.0);
    let right_edge = bbox.right().to_f64().unwrap_or(0.0);

    let mut flags = ZoneFlags::default();
    let first = Zone::of(left_edge, frame_width);
    flags.insert(first);
    if first == Zone::Right {
        return flags;
    }

    match Zone::of(right_edge, frame_width) {
        Zone::Left => {}
        zone => flags.insert(zone),
    }

    if flags.left() && flags.right() {
        flags.insert(Zone::Center);
    }
    flags
}
