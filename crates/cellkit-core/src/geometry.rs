//! Database-unit geometry.
//!
//! Coordinates are integer database units. `Bounds` is the axis-aligned box
//! used for bounding boxes and redisplay areas; an empty box absorbs nothing
//! and contributes nothing to a union.

use serde::{Deserialize, Serialize};

/// Integer database unit.
pub type Coord = i64;

/// A point in database units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: Coord,
    pub min_y: Coord,
    pub max_x: Coord,
    pub max_y: Coord,
}

impl Bounds {
    /// Creates a box from two corners, normalizing the order.
    pub fn new(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// The empty box. `is_empty()` is true and it is the identity for `union`.
    pub const fn empty() -> Self {
        Self {
            min_x: Coord::MAX,
            min_y: Coord::MAX,
            max_x: Coord::MIN,
            max_y: Coord::MIN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> Coord {
        if self.is_empty() {
            0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> Coord {
        if self.is_empty() {
            0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Area as `i128` so large layouts cannot overflow.
    pub fn area(&self) -> i128 {
        self.width() as i128 * self.height() as i128
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grows this box in place to include `other`.
    pub fn add(&mut self, other: &Bounds) {
        *self = self.union(other);
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        !self.is_empty()
            && p.x >= self.min_x
            && p.x <= self.max_x
            && p.y >= self.min_y
            && p.y <= self.max_y
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}
