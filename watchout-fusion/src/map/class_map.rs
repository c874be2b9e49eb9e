use crate::error::{InvalidInput, Result};
use crate::map::{ensure_2d, RoadClass};
use ndarray::{Array2, ArrayView3, ArrayViewD};
use std::ops::Deref;

/// Per-pixel road class of one frame, rows by columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap(Array2<RoadClass>);

impl Deref for ClassMap {
    type Target = Array2<RoadClass>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Array2<RoadClass>> for ClassMap {
    fn from(classes: Array2<RoadClass>) -> Self {
        Self(classes)
    }
}

impl ClassMap {
    pub fn new(classes: Array2<RoadClass>) -> Self {
        Self(classes)
    }

    /// Builds the map from raw class indices as emitted by the segmentation model.
    pub fn from_indices(indices: ArrayViewD<'_, u8>) -> Result<Self> {
        let indices = ensure_2d(indices)?;
        let mut classes = Array2::from_elem(indices.raw_dim(), RoadClass::Background);
        for (class, &index) in classes.iter_mut().zip(indices.iter()) {
            *class = RoadClass::from_index(index)?;
        }
        Ok(Self(classes))
    }

    /// Decodes a colour-coded segmentation image shaped `(height, width, 3)`.
    pub fn from_palette(rgb: ArrayView3<'_, u8>) -> Result<Self> {
        let (height, width, channels) = rgb.dim();
        if channels != 3 {
            return Err(InvalidInput::ChannelCount(channels).into());
        }
        let mut classes = Array2::from_elem((height, width), RoadClass::Background);
        for ((row, col), class) in classes.indexed_iter_mut() {
            let colour = [rgb[[row, col, 0]], rgb[[row, col, 1]], rgb[[row, col, 2]]];
            *class = RoadClass::from_palette_colour(colour)
                .ok_or(InvalidInput::UnknownColour(colour))?;
        }
        Ok(Self(classes))
    }

    pub fn into_inner(self) -> Array2<RoadClass> {
        self.0
    }
}
