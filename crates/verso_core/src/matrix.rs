//! 2D affine matrix
//!
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0   1 |
//! ```
//!
//! Naming follows the canvas convention: `pre_*` operations apply *before*
//! the existing transform (in local space), `post_*` operations apply after
//! it (in device space).

use crate::geometry::{Point, Rect};

/// 2D affine transformation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// Matrix elements [a, b, c, d, tx, ty]
    pub elements: [f32; 6],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub const fn from_elements(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self {
            elements: [a, b, c, d, tx, ty],
        }
    }

    pub const fn translation(x: f32, y: f32) -> Self {
        Self::from_elements(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::from_elements(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Scale followed by a translation
    pub const fn scale_translate(sx: f32, sy: f32, tx: f32, ty: f32) -> Self {
        Self::from_elements(sx, 0.0, 0.0, sy, tx, ty)
    }

    pub fn rotation(radians: f32) -> Self {
        Self::sin_cos(radians.sin(), radians.cos(), Point::ZERO)
    }

    /// Rotation by `radians` around `pivot`
    pub fn rotation_about(radians: f32, pivot: Point) -> Self {
        Self::sin_cos(radians.sin(), radians.cos(), pivot)
    }

    /// Rotation given its sine and cosine, around `pivot`
    pub fn sin_cos(sin: f32, cos: f32, pivot: Point) -> Self {
        let one_minus_cos = 1.0 - cos;
        Self::from_elements(
            cos,
            sin,
            -sin,
            cos,
            sin * pivot.y + one_minus_cos * pivot.x,
            -sin * pivot.x + one_minus_cos * pivot.y,
        )
    }

    pub const fn skew(sx: f32, sy: f32) -> Self {
        Self::from_elements(1.0, sy, sx, 1.0, 0.0, 0.0)
    }

    pub fn scale_x(&self) -> f32 {
        self.elements[0]
    }

    pub fn skew_y(&self) -> f32 {
        self.elements[1]
    }

    pub fn skew_x(&self) -> f32 {
        self.elements[2]
    }

    pub fn scale_y(&self) -> f32 {
        self.elements[3]
    }

    pub fn translate_x(&self) -> f32 {
        self.elements[4]
    }

    pub fn translate_y(&self) -> f32 {
        self.elements[5]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn is_translate(&self) -> bool {
        let [a, b, c, d, _, _] = self.elements;
        a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0
    }

    pub fn is_scale_translate(&self) -> bool {
        self.elements[1] == 0.0 && self.elements[2] == 0.0
    }

    /// True when axis-aligned rects map to axis-aligned rects
    pub fn rect_stays_rect(&self) -> bool {
        let [a, b, c, d, _, _] = self.elements;
        if b == 0.0 && c == 0.0 {
            a != 0.0 && d != 0.0
        } else {
            a == 0.0 && d == 0.0 && b != 0.0 && c != 0.0
        }
    }

    /// Concatenate this transform with another (self * other)
    /// The resulting transform first applies `other`, then `self`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = other.elements;
        Matrix {
            elements: [
                a1 * a2 + c1 * b2,
                b1 * a2 + d1 * b2,
                a1 * c2 + c1 * d2,
                b1 * c2 + d1 * d2,
                a1 * tx2 + c1 * ty2 + tx1,
                b1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    /// `self = self * other`: `other` is applied first
    pub fn pre_concat(&mut self, other: &Matrix) {
        *self = self.then(other);
    }

    /// `self = other * self`: `other` is applied last
    pub fn post_concat(&mut self, other: &Matrix) {
        *self = other.then(self);
    }

    pub fn pre_translate(&mut self, dx: f32, dy: f32) {
        self.pre_concat(&Matrix::translation(dx, dy));
    }

    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.post_concat(&Matrix::translation(dx, dy));
    }

    pub fn pre_scale(&mut self, sx: f32, sy: f32) {
        self.pre_concat(&Matrix::scale(sx, sy));
    }

    pub fn post_scale(&mut self, sx: f32, sy: f32) {
        self.post_concat(&Matrix::scale(sx, sy));
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    pub fn map_points(&self, points: &mut [Point]) {
        for p in points.iter_mut() {
            *p = self.transform_point(*p);
        }
    }

    /// Bounding box of the four mapped corners
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        if self.is_identity() {
            return *rect;
        }
        let corners = [
            self.transform_point(rect.top_left()),
            self.transform_point(rect.top_right()),
            self.transform_point(rect.bottom_right()),
            self.transform_point(rect.bottom_left()),
        ];
        Rect::from_points(&corners)
    }

    pub fn determinant(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        a * d - b * c
    }

    /// Inverse transform, or `None` for singular matrices
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let [a, b, c, d, tx, ty] = self.elements;
        Some(Matrix::from_elements(
            d * inv,
            -b * inv,
            -c * inv,
            a * inv,
            (c * ty - d * tx) * inv,
            (b * tx - a * ty) * inv,
        ))
    }

    /// Uniform scale estimate used to pick tessellation tolerances
    ///
    /// With skew present each axis scale is the length of its basis vector.
    /// When one axis is unscaled the other is returned as is; otherwise the
    /// geometric mean of both.
    pub fn scale_factor(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        let sx = if b == 0.0 { a.abs() } else { (a * a + b * b).sqrt() };
        let sy = if c == 0.0 { d.abs() } else { (c * c + d * d).sqrt() };
        if sx == 1.0 {
            sy
        } else if sy == 1.0 {
            sx
        } else {
            (sx * sy).sqrt()
        }
    }
}
