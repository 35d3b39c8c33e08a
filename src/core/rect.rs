//! Axis-Aligned Rectangles
//!
//! Every collidable in the arena is an axis-aligned box anchored at its
//! top-left corner, so one overlap test serves projectiles, pickups and
//! obstacles alike.

use serde::{Serialize, Deserialize};

/// Axis-aligned rectangle (top-left anchored).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Strict overlap test. Touching edges do not count.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same size, moved to a new corner.
    #[inline]
    pub fn at(&self, x: f32, y: f32) -> Rect {
        Rect { x, y, ..*self }
    }
}

/// Anything with a planar hitbox.
pub trait Bounded {
    /// Current hitbox.
    fn bounds(&self) -> Rect;

    /// Overlap against another hitbox.
    fn overlaps<B: Bounded>(&self, other: &B) -> bool {
        self.bounds().overlaps(&other.bounds())
    }
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let a = Rect::new(0.0, 0.0, 50.0, 70.0);
        let b = Rect::new(25.0, 35.0, 50.0, 70.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        let b = Rect::new(50.0, 0.0, 50.0, 50.0);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_center_and_move() {
        let a = Rect::new(10.0, 20.0, 40.0, 20.0);
        assert_eq!(a.center(), (30.0, 30.0));
        let moved = a.at(0.0, 0.0);
        assert_eq!(moved.width, 40.0);
        assert_eq!(moved.x, 0.0);
    }
}
