//! Geometry for element positioning.

/// Smallest width or height an element can have.
pub const MIN_EXTENT: i32 = 1;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// X position (left edge).
    pub x: i32,
    /// Y position (top edge).
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// A 1x1 rect at the origin.
    pub const UNIT: Self = Self {
        x: 0,
        y: 0,
        width: MIN_EXTENT,
        height: MIN_EXTENT,
    };

    /// Creates a new rectangle, clamping width and height to at least 1.
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(MIN_EXTENT),
            height: height.max(MIN_EXTENT),
        }
    }

    /// Returns the top-left corner.
    #[must_use]
    pub const fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Returns width and height.
    #[must_use]
    pub const fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Returns the right edge (exclusive).
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Returns the bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Returns true if the point is inside the rectangle.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Returns true if two rectangles intersect.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Returns the same size moved by `(dx, dy)`.
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width,
            height: self.height,
        }
    }

    /// Returns this rect with its position replaced.
    #[must_use]
    pub const fn with_position(&self, x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Returns this rect with its size replaced (clamped to at least 1).
    #[must_use]
    pub fn with_size(&self, width: i32, height: i32) -> Self {
        Self::new(self.x, self.y, width, height)
    }
}
