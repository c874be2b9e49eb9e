use thiserror::Error;

pub type Result<T> = std::result::Result<T, FusionError>;

/// Errors raised by the fusion core.
///
/// A class that never shows up in a frame and a frame without any hazard are
/// both normal outcomes and are not represented here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("expected a 2-dimensional map, got {0} dimension(s)")]
    Dimensionality(usize),
    #[error("class map is {class:?} but depth map is {depth:?}")]
    ShapeMismatch {
        class: (usize, usize),
        depth: (usize, usize),
    },
    #[error("road class index {0} is out of range")]
    UnknownRoadClass(u8),
    #[error("segmentation colour {0:?} is not in the road palette")]
    UnknownColour([u8; 3]),
    #[error("palette map must have 3 channels, got {0}")]
    ChannelCount(usize),
    #[error("depth {value} at {at:?} is outside [0, 1]")]
    DepthOutOfRange { value: f32, at: (usize, usize) },
    #[error("{what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("downsample factor must be at least 1")]
    ZeroDownsample,
}

impl FusionError {
    pub fn invalid_input(&self) -> &InvalidInput {
        match self {
            FusionError::InvalidInput(reason) => reason,
        }
    }
}
