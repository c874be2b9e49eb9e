pub mod graph;

pub use graph::{BoundingBox, Point};
