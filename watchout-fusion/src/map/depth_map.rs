use crate::error::{InvalidInput, Result};
use crate::map::ensure_2d;
use ndarray::{Array2, ArrayViewD};
use std::ops::Deref;

/// Relative per-pixel depth of one frame. Smaller is closer, every value is in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap(Array2<f32>);

impl Deref for DepthMap {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Array2<f32>> for DepthMap {
    type Error = crate::error::FusionError;

    fn try_from(depth: Array2<f32>) -> Result<Self> {
        DepthMap::new(depth)
    }
}

impl DepthMap {
    pub fn new(depth: Array2<f32>) -> Result<Self> {
        if let Some(((row, col), &value)) = depth
            .indexed_iter()
            .find(|(_, value)| !(0.0..=1.0).contains(*value))
        {
            return Err(InvalidInput::DepthOutOfRange {
                value,
                at: (row, col),
            }
            .into());
        }
        Ok(Self(depth))
    }

    /// Accepts the depth network output as-is; it must be a single 2-D plane.
    pub fn from_dyn(depth: ArrayViewD<'_, f32>) -> Result<Self> {
        DepthMap::new(ensure_2d(depth)?.to_owned())
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.0
    }
}
