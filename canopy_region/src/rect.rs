// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangle with half-open intersection semantics.

/// An axis-aligned rectangle with `i32` edges.
///
/// `left`/`top` are inclusive and `right`/`bottom` are exclusive, so two
/// rectangles that share only a boundary edge do not intersect. A rectangle
/// with `right <= left` or `bottom <= top` is empty.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RectI {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl RectI {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Creates a rectangle from edge coordinates.
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from origin and size.
    #[must_use]
    pub const fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    /// Width of the rectangle, zero when empty.
    #[must_use]
    pub const fn width(&self) -> i32 {
        if self.right > self.left {
            self.right - self.left
        } else {
            0
        }
    }

    /// Height of the rectangle, zero when empty.
    #[must_use]
    pub const fn height(&self) -> i32 {
        if self.bottom > self.top {
            self.bottom - self.top
        } else {
            0
        }
    }

    /// Returns true when the rectangle encloses no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Area of the rectangle, zero when empty.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width().unsigned_abs()) * u64::from(self.height().unsigned_abs())
    }

    /// Returns true when the interiors of `self` and `other` overlap.
    ///
    /// Half-open semantics: rectangles that share only a boundary edge are
    /// not considered intersecting.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Intersection of `self` and `other`; empty when they do not overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let r = Self {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() { Self::ZERO } else { r }
    }

    /// Smallest rectangle containing both `self` and `other`.
    ///
    /// Joining with an empty rectangle returns the other operand unchanged,
    /// so repeated joins never grow a dirty rect past its real extent.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Returns true when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty()
            || (self.left <= other.left
                && self.top <= other.top
                && self.right >= other.right
                && self.bottom >= other.bottom)
    }

    /// Expands each edge outward by the given amounts.
    #[must_use]
    pub const fn outset(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left - dx,
            top: self.top - dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Aligns the rectangle outward to a grid of `align_x` by `align_y`
    /// pixels. Used for dirty-region alignment so partial-render scissor
    /// rects land on hardware-friendly boundaries.
    #[must_use]
    pub fn align_outward(&self, align_x: i32, align_y: i32) -> Self {
        if self.is_empty() || align_x <= 0 || align_y <= 0 {
            return *self;
        }
        Self {
            left: self.left.div_euclid(align_x) * align_x,
            top: self.top.div_euclid(align_y) * align_y,
            right: (self.right + align_x - 1).div_euclid(align_x) * align_x,
            bottom: (self.bottom + align_y - 1).div_euclid(align_y) * align_y,
        }
    }

    /// Translates the rectangle by the given offset.
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detection() {
        assert!(RectI::ZERO.is_empty());
        assert!(RectI::new(10, 10, 10, 20).is_empty());
        assert!(RectI::new(10, 10, 5, 20).is_empty());
        assert!(!RectI::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn shared_edge_does_not_intersect() {
        let a = RectI::new(0, 0, 100, 100);
        let b = RectI::new(100, 0, 200, 100);
        assert!(!a.intersects(&b));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn overlap_intersects() {
        let a = RectI::new(0, 0, 100, 100);
        let b = RectI::new(99, 0, 200, 100);
        assert!(a.intersects(&b));
        assert_eq!(a.intersect(&b), RectI::new(99, 0, 100, 100));
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = RectI::new(5, 5, 50, 50);
        assert_eq!(a.union(&RectI::ZERO), a);
        assert_eq!(RectI::ZERO.union(&a), a);
    }

    #[test]
    fn union_covers_both() {
        let a = RectI::new(0, 0, 100, 100);
        let b = RectI::new(10, 10, 110, 110);
        assert_eq!(a.union(&b), RectI::new(0, 0, 110, 110));
    }

    #[test]
    fn align_outward_grows_to_grid() {
        let r = RectI::new(3, 5, 17, 29);
        let aligned = r.align_outward(16, 16);
        assert_eq!(aligned, RectI::new(0, 0, 32, 32));
        assert!(aligned.contains(&r));
    }

    #[test]
    fn align_outward_negative_coordinates() {
        let r = RectI::new(-3, -5, 1, 1);
        let aligned = r.align_outward(16, 16);
        assert!(aligned.contains(&r));
        assert_eq!(aligned, RectI::new(-16, -16, 16, 16));
    }

    #[test]
    fn area_of_degenerate_is_zero() {
        assert_eq!(RectI::new(10, 10, 0, 0).area(), 0);
        assert_eq!(RectI::new(0, 0, 10, 20).area(), 200);
    }
}
