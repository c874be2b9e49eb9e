use num::{Num, ToPrimitive};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point<T: Num> {
    pub x: T,
    pub y: T,
}

impl<T: Num> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box described by its four corners, in the order the detector emits them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox<T: Num> {
    pub top_left: Point<T>,
    pub top_right: Point<T>,
    pub bottom_left: Point<T>,
    pub bottom_right: Point<T>,
}

impl<T: Num + Copy> BoundingBox<T> {
    /// Builds the four corners from `(x1, y1)` top-left and `(x2, y2)` bottom-right.
    pub fn from_xyxy(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self {
            top_left: Point::new(x1, y1),
            top_right: Point::new(x2, y1),
            bottom_left: Point::new(x1, y2),
            bottom_right: Point::new(x2, y2),
        }
    }

    pub fn left(&self) -> T {
        self.top_left.x
    }

    pub fn right(&self) -> T {
        self.top_right.x
    }

    pub fn top(&self) -> T {
        self.top_left.y
    }

    pub fn bottom(&self) -> T {
        self.bottom_right.y
    }

    pub fn width(&self) -> T {
        self.right() - self.left()
    }

    pub fn height(&self) -> T {
        self.bottom() - self.top()
    }
}

impl<T: Num + Copy + ToPrimitive> BoundingBox<T> {
    /// Pixel row and column ranges covered by the box, clamped to a `height` x `width` frame.
    /// Coordinates are truncated toward zero like an integer cast of the detector output.
    pub fn pixel_span(
        &self,
        height: usize,
        width: usize,
    ) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let rows = to_pixel(self.top(), height)..to_pixel(self.bottom(), height);
        let cols = to_pixel(self.left(), width)..to_pixel(self.bottom_right.x, width);
        (rows, cols)
    }
}

fn to_pixel<T: ToPrimitive>(value: T, limit: usize) -> usize {
    value
        .to_f64()
        .map_or(0, |v| (v.max(0.0) as usize).min(limit))
}
