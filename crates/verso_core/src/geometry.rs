//! Core geometry types
//!
//! Rectangles are stored as edges (`left`, `top`, `right`, `bottom`) because
//! every consumer in the renderer intersects, unions and inflates bounds far
//! more often than it reads an origin/size pair.

use std::ops::{Add, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Point
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point (also used as an offset / vector)
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn dot(&self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    pub fn cross(&self, other: Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(&self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Size
// ─────────────────────────────────────────────────────────────────────────────

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect::from_ltrb(0.0, 0.0, self.width, self.height)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rect
// ─────────────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect::from_ltrb(0.0, 0.0, 0.0, 0.0);

    /// The unit square, used as the default texture sub-rect
    pub const UNIT: Rect = Rect::from_ltrb(0.0, 0.0, 1.0, 1.0);

    pub const fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::from_ltrb(left, top, left + width, top + height)
    }

    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        Self::from_ltrb(
            center.x - width * 0.5,
            center.y - height * 0.5,
            center.x + width * 0.5,
            center.y + height * 0.5,
        )
    }

    pub fn from_circle(center: Point, radius: f32) -> Self {
        Self::from_center(center, radius * 2.0, radius * 2.0)
    }

    /// Smallest rect containing all `points`, or `Rect::ZERO` when there are none
    pub fn from_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Rect::ZERO;
        };
        let mut rect = Rect::from_ltrb(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        rect
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right, self.top)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// True when the rect encloses no area
    pub fn is_empty(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// True when `other` lies entirely inside this rect
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right > other.left
            && other.right > self.left
            && self.bottom > other.top
            && other.bottom > self.top
    }

    /// Intersection of the two rects; may be empty
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect::from_ltrb(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        )
    }

    /// Union of the two rects
    pub fn expand_to_include(&self, other: &Rect) -> Rect {
        Rect::from_ltrb(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn inflate(&self, delta: f32) -> Rect {
        Rect::from_ltrb(
            self.left - delta,
            self.top - delta,
            self.right + delta,
            self.bottom + delta,
        )
    }

    pub fn deflate(&self, delta: f32) -> Rect {
        self.inflate(-delta)
    }

    pub fn shift(&self, offset: Point) -> Rect {
        Rect::from_ltrb(
            self.left + offset.x,
            self.top + offset.y,
            self.right + offset.x,
            self.bottom + offset.y,
        )
    }

    pub fn scale(&self, sx: f32, sy: f32) -> Rect {
        Rect::from_ltrb(
            self.left * sx,
            self.top * sy,
            self.right * sx,
            self.bottom * sy,
        )
    }

    /// Snap outwards to whole pixels
    pub fn round_out(&self) -> Rect {
        Rect::from_ltrb(
            self.left.floor(),
            self.top.floor(),
            self.right.ceil(),
            self.bottom.ceil(),
        )
    }

    /// Normalize to the unit square of `within`
    pub fn normalize_to(&self, within: &Rect) -> Rect {
        let w = within.width();
        let h = within.height();
        if w <= 0.0 || h <= 0.0 {
            return Rect::ZERO;
        }
        Rect::from_ltrb(
            (self.left - within.left) / w,
            (self.top - within.top) / h,
            (self.right - within.left) / w,
            (self.bottom - within.top) / h,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rounded rectangles
// ─────────────────────────────────────────────────────────────────────────────

/// Elliptical corner radius
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Radius {
    pub x: f32,
    pub y: f32,
}

impl Radius {
    pub const ZERO: Radius = Radius { x: 0.0, y: 0.0 };

    pub const fn circular(radius: f32) -> Self {
        Self {
            x: radius,
            y: radius,
        }
    }

    pub const fn elliptical(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<f32> for Radius {
    fn from(radius: f32) -> Self {
        Self::circular(radius)
    }
}

/// Rectangle with per-corner radii
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RRect {
    pub rect: Rect,
    pub top_left: Radius,
    pub top_right: Radius,
    pub bottom_right: Radius,
    pub bottom_left: Radius,
}

impl RRect {
    pub fn from_rect(rect: Rect) -> Self {
        Self::from_rect_radius(rect, Radius::ZERO)
    }

    pub fn from_rect_radius(rect: Rect, radius: impl Into<Radius>) -> Self {
        let radius = radius.into();
        Self {
            rect,
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    pub fn from_rect_radii(
        rect: Rect,
        top_left: Radius,
        top_right: Radius,
        bottom_right: Radius,
        bottom_left: Radius,
    ) -> Self {
        Self {
            rect,
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    pub fn outer_rect(&self) -> Rect {
        self.rect
    }

    /// True when every corner radius is zero
    pub fn is_rect(&self) -> bool {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
            .iter()
            .all(|r| r.x <= 0.0 || r.y <= 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect_and_union() {
        let a = Rect::from_ltrb(0.0, 0.0, 100.0, 100.0);
        let b = Rect::from_ltrb(50.0, 60.0, 150.0, 160.0);

        assert_eq!(a.intersect(&b), Rect::from_ltrb(50.0, 60.0, 100.0, 100.0));
        assert_eq!(
            a.expand_to_include(&b),
            Rect::from_ltrb(0.0, 0.0, 150.0, 160.0)
        );
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_rect_disjoint_is_empty() {
        let a = Rect::from_ltwh(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_ltwh(20.0, 20.0, 10.0, 10.0);

        assert!(!a.overlaps(&b));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn test_rect_round_out() {
        let r = Rect::from_ltrb(0.4, 1.6, 9.2, 10.0);
        assert_eq!(r.round_out(), Rect::from_ltrb(0.0, 1.0, 10.0, 10.0));
    }

    #[test]
    fn test_rect_from_points() {
        let pts = [
            Point::new(3.0, 4.0),
            Point::new(-1.0, 8.0),
            Point::new(5.0, -2.0),
        ];
        assert_eq!(
            Rect::from_points(&pts),
            Rect::from_ltrb(-1.0, -2.0, 5.0, 8.0)
        );
        assert_eq!(Rect::from_points(&[]), Rect::ZERO);
    }

    #[test]
    fn test_rrect_is_rect() {
        let r = Rect::from_ltwh(0.0, 0.0, 10.0, 10.0);
        assert!(RRect::from_rect(r).is_rect());
        assert!(!RRect::from_rect_radius(r, 2.0).is_rect());
    }
}
