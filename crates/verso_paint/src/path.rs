//! Path building and representation
//!
//! A [`Path`] is an append-only command log with incrementally maintained
//! bounds. Every mutation bumps the path version and drops the cached
//! flattening, so a [`PathCache`] handed out by [`Path::flatten`] is only
//! reused while the path is untouched and the scale stays in one 0.5 bucket.

use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

use lyon::geom::{point as lyon_point, CubicBezierSegment};
use smallvec::SmallVec;
use verso_core::{Matrix, Point, RRect, Rect};

use crate::path_cache::{PathCache, PointFlags};
use crate::stroke;
use crate::tessellation::TessellationCache;

/// Cubic approximation constant for a quarter circle
const KAPPA90: f32 = 0.552_284_8;

/// Tolerance used to flatten curves for hit testing
const HIT_TEST_TOLERANCE: f32 = 0.1;

/// Orientation applied to the last subpath
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathWinding {
    /// Points are used in input order
    #[default]
    CounterClockwise,
    /// Points are used in reversed order
    Clockwise,
}

/// Cheap classification of simple paths, used to skip convexity tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathShape {
    #[default]
    Other,
    Rect,
    Circle,
    RRect,
}

/// Path command
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    Close,
    Winding(PathWinding),
}

/// A 2D path composed of commands
#[derive(Clone, Debug)]
pub struct Path {
    commands: SmallVec<[PathCommand; 16]>,
    current: Point,
    min: Point,
    max: Point,
    shape: PathShape,
    version: u64,
    cache: RefCell<Option<Rc<PathCache>>>,
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Path {
    pub fn new() -> Self {
        Self {
            commands: SmallVec::new(),
            current: Point::ZERO,
            min: Point::new(f32::MAX, f32::MAX),
            max: Point::new(f32::MIN, f32::MIN),
            shape: PathShape::Other,
            version: 0,
            cache: RefCell::new(None),
        }
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Monotonic mutation counter
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn shape(&self) -> PathShape {
        self.shape
    }

    /// Current pen position
    pub fn current_point(&self) -> Point {
        self.current
    }

    /// Bounds of all segment end and control points
    ///
    /// Degenerate (zero-width or zero-height) bounds are kept so straight
    /// lines still report their extent; a path with no segments reports
    /// `Rect::ZERO`.
    pub fn bounds(&self) -> Rect {
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return Rect::ZERO;
        }
        Rect::from_ltrb(self.min.x, self.min.y, self.max.x, self.max.y)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Appending
    // ─────────────────────────────────────────────────────────────────────────

    fn expand_bounds(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    fn push(&mut self, command: PathCommand) {
        match command {
            PathCommand::MoveTo(p) => self.current = p,
            PathCommand::LineTo(p) => {
                self.expand_bounds(self.current);
                self.expand_bounds(p);
                self.current = p;
            }
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                self.expand_bounds(self.current);
                self.expand_bounds(control1);
                self.expand_bounds(control2);
                self.expand_bounds(end);
                self.current = end;
            }
            PathCommand::Close | PathCommand::Winding(_) => {}
        }
        self.commands.push(command);
        self.version += 1;
        *self.cache.get_mut() = None;
    }

    /// Record `shape` when the path held only that shape
    fn set_shape_hint(&mut self, was_empty: bool, shape: PathShape) {
        self.shape = if was_empty { shape } else { PathShape::Other };
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.push(PathCommand::MoveTo(Point::new(x, y)));
    }

    pub fn relative_move_to(&mut self, dx: f32, dy: f32) {
        let c = self.current;
        self.move_to(c.x + dx, c.y + dy);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.shape = PathShape::Other;
        self.push(PathCommand::LineTo(Point::new(x, y)));
    }

    pub fn relative_line_to(&mut self, dx: f32, dy: f32) {
        let c = self.current;
        self.line_to(c.x + dx, c.y + dy);
    }

    pub fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        self.shape = PathShape::Other;
        self.push(PathCommand::CubicTo {
            control1: Point::new(x1, y1),
            control2: Point::new(x2, y2),
            end: Point::new(x3, y3),
        });
    }

    pub fn relative_cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        let c = self.current;
        self.cubic_to(
            c.x + x1,
            c.y + y1,
            c.x + x2,
            c.y + y2,
            c.x + x3,
            c.y + y3,
        );
    }

    /// Quadratic curve, stored as the equivalent cubic
    pub fn quadratic_bezier_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let p0 = self.current;
        let c = Point::new(x1, y1);
        let p = Point::new(x2, y2);
        let c1 = p0 + (c - p0) * (2.0 / 3.0);
        let c2 = p + (c - p) * (2.0 / 3.0);
        self.cubic_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
    }

    pub fn relative_quadratic_bezier_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let c = self.current;
        self.quadratic_bezier_to(c.x + x1, c.y + y1, c.x + x2, c.y + y2);
    }

    /// Rational quadratic curve with weight `w`
    ///
    /// `w == 1` is a plain quadratic; other weights are approximated by
    /// splitting the conic into quadratics.
    pub fn conic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, w: f32) {
        if !(w > 0.0) || !w.is_finite() {
            self.line_to(x2, y2);
            return;
        }
        if (w - 1.0).abs() < 1e-6 {
            self.quadratic_bezier_to(x1, y1, x2, y2);
            return;
        }

        let p0 = self.current;
        let p1 = Point::new(x1, y1);
        let p2 = Point::new(x2, y2);
        let mut quads = Vec::new();
        split_conic(p0, p1, p2, w, 3, &mut quads);
        for (c, end) in quads {
            self.quadratic_bezier_to(c.x, c.y, end.x, end.y);
        }
    }

    pub fn relative_conic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, w: f32) {
        let c = self.current;
        self.conic_to(c.x + x1, c.y + y1, c.x + x2, c.y + y2, w);
    }

    pub fn close(&mut self) {
        self.push(PathCommand::Close);
    }

    /// Set the orientation of the last subpath
    pub fn winding(&mut self, dir: PathWinding) {
        self.push(PathCommand::Winding(dir));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shapes
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_rect(&mut self, rect: Rect) {
        let was_empty = self.is_empty();
        self.move_to(rect.left, rect.top);
        self.line_to(rect.left, rect.bottom);
        self.line_to(rect.right, rect.bottom);
        self.line_to(rect.right, rect.top);
        self.close();
        self.set_shape_hint(was_empty, PathShape::Rect);
    }

    /// Rounded rect with per-corner radii clamped to half the size
    pub fn add_rrect(&mut self, rrect: &RRect) {
        if rrect.is_rect() {
            self.add_rect(rrect.rect);
            return;
        }

        let was_empty = self.is_empty();
        let r = &rrect.rect;
        let w = r.width();
        let h = r.height();
        let halfw = w.abs() * 0.5;
        let halfh = h.abs() * 0.5;
        let sign_w = if w < 0.0 { -1.0 } else { 1.0 };
        let sign_h = if h < 0.0 { -1.0 } else { 1.0 };

        let clamp = |radius: f32, half: f32, sign: f32| radius.min(half) * sign;
        let rx_bl = clamp(rrect.bottom_left.x, halfw, sign_w);
        let ry_bl = clamp(rrect.bottom_left.y, halfh, sign_h);
        let rx_br = clamp(rrect.bottom_right.x, halfw, sign_w);
        let ry_br = clamp(rrect.bottom_right.y, halfh, sign_h);
        let rx_tr = clamp(rrect.top_right.x, halfw, sign_w);
        let ry_tr = clamp(rrect.top_right.y, halfh, sign_h);
        let rx_tl = clamp(rrect.top_left.x, halfw, sign_w);
        let ry_tl = clamp(rrect.top_left.y, halfh, sign_h);
        let x = r.left;
        let y = r.top;
        let k = 1.0 - KAPPA90;

        self.move_to(x, y + ry_tl);
        self.line_to(x, y + h - ry_bl);
        self.cubic_to(
            x,
            y + h - ry_bl * k,
            x + rx_bl * k,
            y + h,
            x + rx_bl,
            y + h,
        );
        self.line_to(x + w - rx_br, y + h);
        self.cubic_to(
            x + w - rx_br * k,
            y + h,
            x + w,
            y + h - ry_br * k,
            x + w,
            y + h - ry_br,
        );
        self.line_to(x + w, y + ry_tr);
        self.cubic_to(x + w, y + ry_tr * k, x + w - rx_tr * k, y, x + w - rx_tr, y);
        self.line_to(x + rx_tl, y);
        self.cubic_to(x + rx_tl * k, y, x, y + ry_tl * k, x, y + ry_tl);
        self.close();
        self.set_shape_hint(was_empty, PathShape::RRect);
    }

    pub fn add_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32) {
        let was_empty = self.is_empty();
        self.move_to(cx - rx, cy);
        self.cubic_to(
            cx - rx,
            cy + ry * KAPPA90,
            cx - rx * KAPPA90,
            cy + ry,
            cx,
            cy + ry,
        );
        self.cubic_to(
            cx + rx * KAPPA90,
            cy + ry,
            cx + rx,
            cy + ry * KAPPA90,
            cx + rx,
            cy,
        );
        self.cubic_to(
            cx + rx,
            cy - ry * KAPPA90,
            cx + rx * KAPPA90,
            cy - ry,
            cx,
            cy - ry,
        );
        self.cubic_to(
            cx - rx * KAPPA90,
            cy - ry,
            cx - rx,
            cy - ry * KAPPA90,
            cx - rx,
            cy,
        );
        self.close();
        let shape = if rx == ry {
            PathShape::Circle
        } else {
            PathShape::Other
        };
        self.set_shape_hint(was_empty, shape);
    }

    pub fn add_circle(&mut self, center: Point, radius: f32) {
        self.add_ellipse(center.x, center.y, radius, radius);
    }

    pub fn add_oval(&mut self, oval: Rect) {
        let c = oval.center();
        self.add_ellipse(c.x, c.y, oval.width() * 0.5, oval.height() * 0.5);
    }

    /// Arc of the circle centred at `(cx, cy)` from angle `a0` to `a1`
    pub fn add_arc_to_angles(
        &mut self,
        center: Point,
        radius: f32,
        a0: f32,
        a1: f32,
        dir: PathWinding,
        force_move_to: bool,
    ) {
        self.append_arc(center, radius, a0, a1, dir, force_move_to, None);
    }

    /// Arc inscribed in `rect`, starting a new subpath when `force_move_to`
    pub fn arc_to(&mut self, rect: Rect, start_angle: f32, sweep_angle: f32, force_move_to: bool) {
        let center = rect.center();
        let transform =
            Matrix::scale_translate(rect.width() * 0.5, rect.height() * 0.5, center.x, center.y);
        let dir = if sweep_angle >= 0.0 {
            PathWinding::Clockwise
        } else {
            PathWinding::CounterClockwise
        };
        self.append_arc(
            Point::ZERO,
            1.0,
            start_angle,
            start_angle + sweep_angle,
            dir,
            force_move_to,
            Some(&transform),
        );
    }

    /// Arc as a new subpath
    pub fn add_arc(&mut self, rect: Rect, start_angle: f32, sweep_angle: f32) {
        self.arc_to(rect, start_angle, sweep_angle, true);
    }

    /// Arc of `radius` tangent to the lines (current → p1) and (p1 → p2)
    pub fn arc_to_point(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) {
        let p0 = self.current;
        let mut dx0 = p0.x - x1;
        let mut dy0 = p0.y - y1;
        let mut dx1 = x2 - x1;
        let mut dy1 = y2 - y1;
        stroke::normalize(&mut dx0, &mut dy0);
        stroke::normalize(&mut dx1, &mut dy1);
        let a = (dx0 * dx1 + dy0 * dy1).clamp(-1.0, 1.0).acos();
        let d = radius / (a / 2.0).tan();

        if !(d <= 10000.0) {
            self.line_to(x1, y1);
            return;
        }

        let cross = dx1 * dy0 - dx0 * dy1;
        let (cx, cy, a0, a1, dir) = if cross > 0.0 {
            (
                x1 + dx0 * d + dy0 * radius,
                y1 + dy0 * d - dx0 * radius,
                dx0.atan2(-dy0),
                (-dx1).atan2(dy1),
                PathWinding::Clockwise,
            )
        } else {
            (
                x1 + dx0 * d - dy0 * radius,
                y1 + dy0 * d + dx0 * radius,
                (-dx0).atan2(dy0),
                dx1.atan2(-dy1),
                PathWinding::CounterClockwise,
            )
        };

        self.append_arc(Point::new(cx, cy), radius, a0, a1, dir, false, None);
    }

    /// Append an arc as up to five cubic segments
    #[allow(clippy::too_many_arguments)]
    fn append_arc(
        &mut self,
        center: Point,
        r: f32,
        a0: f32,
        a1: f32,
        dir: PathWinding,
        force_move_to: bool,
        transform: Option<&Matrix>,
    ) {
        let full = PI * 2.0;
        let mut da = a1 - a0;
        match dir {
            PathWinding::Clockwise => {
                if da.abs() >= full {
                    da = full;
                } else {
                    while da < 0.0 {
                        da += full;
                    }
                    if da <= 1e-5 {
                        return;
                    }
                }
            }
            PathWinding::CounterClockwise => {
                if da.abs() >= full {
                    da = -full;
                } else {
                    while da > 0.0 {
                        da -= full;
                    }
                    if da >= -1e-5 {
                        return;
                    }
                }
            }
        }

        // Split into segments of at most 90 degrees
        let ndivs = ((da.abs() / (PI * 0.5) + 0.5) as i32).clamp(1, 5);
        let hda = (da / ndivs as f32) / 2.0;
        let mut kappa = (4.0 / 3.0 * (1.0 - hda.cos()) / hda.sin()).abs();
        if dir == PathWinding::CounterClockwise {
            kappa = -kappa;
        }

        let map = |p: Point| transform.map_or(p, |m| m.transform_point(p));
        let move_to = force_move_to || self.is_empty();
        let mut prev = Point::ZERO;
        let mut prev_tan = Point::ZERO;

        for i in 0..=ndivs {
            let a = a0 + da * (i as f32 / ndivs as f32);
            let (dy, dx) = a.sin_cos();
            let p = Point::new(center.x + dx * r, center.y + dy * r);
            let tan = Point::new(-dy * r * kappa, dx * r * kappa);

            if i == 0 {
                let start = map(p);
                if move_to {
                    self.move_to(start.x, start.y);
                } else {
                    self.line_to(start.x, start.y);
                }
            } else {
                let c1 = map(prev + prev_tan);
                let c2 = map(p - tan);
                let end = map(p);
                self.cubic_to(c1.x, c1.y, c2.x, c2.y, end.x, end.y);
            }
            prev = p;
            prev_tan = tan;
        }
    }

    pub fn add_polygon(&mut self, points: &[Point], close: bool) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        if close {
            self.close();
        }
    }

    /// Append all of `other`'s commands shifted by `offset`
    pub fn add_path(&mut self, other: &Path, offset: Point) {
        let shape = other.shape;
        let was_empty = self.is_empty();
        for command in other.commands.iter() {
            let shifted = match *command {
                PathCommand::MoveTo(p) => PathCommand::MoveTo(p + offset),
                PathCommand::LineTo(p) => PathCommand::LineTo(p + offset),
                PathCommand::CubicTo {
                    control1,
                    control2,
                    end,
                } => PathCommand::CubicTo {
                    control1: control1 + offset,
                    control2: control2 + offset,
                    end: end + offset,
                },
                other => other,
            };
            self.push(shifted);
        }
        self.set_shape_hint(was_empty, shape);
    }

    /// Copy of this path translated by `offset`
    pub fn shift(&self, offset: Point) -> Path {
        let mut path = Path::new();
        path.add_path(self, offset);
        path
    }

    /// Copy of this path with every point mapped by `matrix`
    pub fn transform(&self, matrix: &Matrix) -> Path {
        let mut path = Path::new();
        for command in self.commands.iter() {
            let mapped = match *command {
                PathCommand::MoveTo(p) => PathCommand::MoveTo(matrix.transform_point(p)),
                PathCommand::LineTo(p) => PathCommand::LineTo(matrix.transform_point(p)),
                PathCommand::CubicTo {
                    control1,
                    control2,
                    end,
                } => PathCommand::CubicTo {
                    control1: matrix.transform_point(control1),
                    control2: matrix.transform_point(control2),
                    end: matrix.transform_point(end),
                },
                other => other,
            };
            path.push(mapped);
        }
        path
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Flattening
    // ─────────────────────────────────────────────────────────────────────────

    /// Flattened geometry for `scale`, rounded to the nearest 0.5
    ///
    /// The returned cache is shared until the path is mutated or a scale in
    /// another bucket is requested.
    pub fn flatten(&self, scale: f32, tess: &mut TessellationCache) -> Rc<PathCache> {
        let scale = ((scale * 2.0).round() / 2.0).max(0.5);

        if let Some(cache) = self.cache.borrow().as_ref() {
            if cache.can_reuse(scale, self.version) {
                return cache.clone();
            }
        }

        let mut cache = PathCache::new(scale, self.version, self.shape);
        for command in self.commands.iter() {
            match *command {
                PathCommand::MoveTo(p) => {
                    cache.add_path();
                    cache.add_point(p.x, p.y, PointFlags::CORNER);
                }
                PathCommand::LineTo(p) => cache.add_point(p.x, p.y, PointFlags::CORNER),
                PathCommand::CubicTo {
                    control1,
                    control2,
                    end,
                } => cache.tessellate_bezier(tess, control1, control2, end, PointFlags::CORNER),
                PathCommand::Close => cache.close_path(),
                PathCommand::Winding(dir) => cache.path_winding(dir),
            }
        }
        cache.normalize();

        let cache = Rc::new(cache);
        *self.cache.borrow_mut() = Some(cache.clone());
        cache
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hit testing
    // ─────────────────────────────────────────────────────────────────────────

    /// Non-zero winding containment test
    pub fn contains(&self, point: Point) -> bool {
        let bounds = self.bounds();
        if point.x < bounds.left
            || point.x > bounds.right
            || point.y < bounds.top
            || point.y > bounds.bottom
        {
            return false;
        }

        let mut total = 0i32;
        let mut w = 0i32;
        let mut winding = PathWinding::CounterClockwise;
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;

        let flush = |w: &mut i32, winding: PathWinding, total: &mut i32| {
            if *w != 0 {
                *total += match winding {
                    PathWinding::CounterClockwise => *w,
                    PathWinding::Clockwise => -*w,
                };
                *w = 0;
            }
        };

        for command in self.commands.iter() {
            match *command {
                PathCommand::MoveTo(p) => {
                    if start != current {
                        w += winding_line(current, start, point);
                    }
                    flush(&mut w, winding, &mut total);
                    start = p;
                    current = p;
                    winding = PathWinding::CounterClockwise;
                }
                PathCommand::LineTo(p) => {
                    w += winding_line(current, p, point);
                    current = p;
                }
                PathCommand::CubicTo {
                    control1,
                    control2,
                    end,
                } => {
                    w += winding_cubic(current, control1, control2, end, point);
                    current = end;
                }
                PathCommand::Close => {}
                PathCommand::Winding(dir) => winding = dir,
            }
        }

        if start != current {
            w += winding_line(current, start, point);
        }
        flush(&mut w, winding, &mut total);

        total != 0
    }
}

/// Contribution of the edge `p0 → p1` to the winding number at `point`
fn winding_line(p0: Point, p1: Point, point: Point) -> i32 {
    if p0.y == p1.y {
        return 0;
    }

    let (dir, min_y, max_y) = if p0.y > p1.y {
        (-1, p1.y, p0.y)
    } else {
        (1, p0.y, p1.y)
    };
    if point.y < min_y || point.y >= max_y {
        return 0;
    }

    let cross = (p1.x - p0.x) * (point.y - p0.y) - (point.x - p0.x) * (p1.y - p0.y);
    if cross == 0.0 {
        return 0;
    }
    let sign = if cross > 0.0 { 1 } else { -1 };
    if sign == dir {
        0
    } else {
        dir
    }
}

fn winding_cubic(p0: Point, c1: Point, c2: Point, p3: Point, point: Point) -> i32 {
    let segment = CubicBezierSegment {
        from: lyon_point(p0.x, p0.y),
        ctrl1: lyon_point(c1.x, c1.y),
        ctrl2: lyon_point(c2.x, c2.y),
        to: lyon_point(p3.x, p3.y),
    };

    let mut w = 0;
    let mut prev = p0;
    for p in segment.flattened(HIT_TEST_TOLERANCE) {
        let next = Point::new(p.x, p.y);
        w += winding_line(prev, next, point);
        prev = next;
    }
    w
}

/// Split a conic into `2^depth` quadratics, returning (control, end) pairs
fn split_conic(p0: Point, p1: Point, p2: Point, w: f32, depth: u32, out: &mut Vec<(Point, Point)>) {
    if depth == 0 {
        out.push((p1, p2));
        return;
    }

    // Chop at t = 0.5 in homogeneous coordinates
    let scale = 1.0 / (1.0 + w);
    let new_w = ((1.0 + w) * 0.5).sqrt();
    let mid = Point::new(
        (p0.x + 2.0 * w * p1.x + p2.x) * 0.25 * 2.0 * scale,
        (p0.y + 2.0 * w * p1.y + p2.y) * 0.25 * 2.0 * scale,
    );
    let c0 = Point::new((p0.x + w * p1.x) * scale, (p0.y + w * p1.y) * scale);
    let c1 = Point::new((w * p1.x + p2.x) * scale, (w * p1.y + p2.y) * scale);

    split_conic(p0, c0, mid, new_w, depth - 1, out);
    split_conic(mid, c1, p2, new_w, depth - 1, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_follow_segments() {
        let mut path = Path::new();
        assert_eq!(path.bounds(), Rect::ZERO);

        path.move_to(5.0, 5.0);
        assert_eq!(path.bounds(), Rect::ZERO);

        path.line_to(15.0, 25.0);
        assert_eq!(path.bounds(), Rect::from_ltrb(5.0, 5.0, 15.0, 25.0));

        path.cubic_to(30.0, 0.0, 40.0, 0.0, 20.0, 10.0);
        assert_eq!(path.bounds(), Rect::from_ltrb(5.0, 0.0, 40.0, 25.0));
    }

    #[test]
    fn test_mutation_bumps_version() {
        let mut path = Path::new();
        let v0 = path.version();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 1.0);
        assert!(path.version() > v0);
    }

    #[test]
    fn test_shape_hints() {
        let mut rect = Path::new();
        rect.add_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0));
        assert_eq!(rect.shape(), PathShape::Rect);

        let mut circle = Path::new();
        circle.add_circle(Point::new(5.0, 5.0), 5.0);
        assert_eq!(circle.shape(), PathShape::Circle);

        circle.line_to(100.0, 100.0);
        assert_eq!(circle.shape(), PathShape::Other);

        let mut two = Path::new();
        two.add_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0));
        two.add_rect(Rect::from_ltwh(20.0, 0.0, 10.0, 10.0));
        assert_eq!(two.shape(), PathShape::Other);
    }

    #[test]
    fn test_quadratic_elevation() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.quadratic_bezier_to(30.0, 30.0, 60.0, 0.0);
        match path.commands()[1] {
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                assert_eq!(control1, Point::new(20.0, 20.0));
                assert_eq!(control2, Point::new(40.0, 20.0));
                assert_eq!(end, Point::new(60.0, 0.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_arc_quarter_circle() {
        let mut path = Path::new();
        path.add_arc(Rect::from_ltrb(-10.0, -10.0, 10.0, 10.0), 0.0, PI * 0.5);
        assert_eq!(path.commands().len(), 2);
        let end = path.current_point();
        assert!(end.x.abs() < 1e-4 && (end.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_full_arc_has_four_segments() {
        let mut path = Path::new();
        path.add_arc_to_angles(
            Point::new(0.0, 0.0),
            10.0,
            0.0,
            PI * 2.0,
            PathWinding::Clockwise,
            true,
        );
        assert_eq!(path.commands().len(), 5);
    }

    #[test]
    fn test_tiny_arc_is_dropped() {
        let mut path = Path::new();
        path.add_arc_to_angles(
            Point::ZERO,
            10.0,
            1.0,
            1.0,
            PathWinding::Clockwise,
            true,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn test_arc_to_point_fold_back_is_line() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.arc_to_point(10.0, 0.0, 0.0, 0.0, 5.0);
        assert_eq!(path.commands()[1], PathCommand::LineTo(Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_contains_rect() {
        let mut path = Path::new();
        path.add_rect(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
        assert!(path.contains(Point::new(5.0, 5.0)));
        assert!(!path.contains(Point::new(15.0, 5.0)));
    }

    #[test]
    fn test_contains_circle() {
        let mut path = Path::new();
        path.add_circle(Point::new(50.0, 50.0), 50.0);
        assert!(path.contains(Point::new(50.0, 50.0)));
        assert!(path.contains(Point::new(90.0, 50.0)));
        assert!(!path.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_contains_ring_with_reversed_hole() {
        let mut path = Path::new();
        path.add_rect(Rect::from_ltrb(0.0, 0.0, 30.0, 30.0));
        path.add_rect(Rect::from_ltrb(10.0, 10.0, 20.0, 20.0));
        path.winding(PathWinding::Clockwise);

        assert!(path.contains(Point::new(5.0, 5.0)));
        assert!(!path.contains(Point::new(15.0, 15.0)));
    }

    #[test]
    fn test_shift_and_transform() {
        let mut path = Path::new();
        path.add_rect(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));

        let shifted = path.shift(Point::new(5.0, 5.0));
        assert_eq!(shifted.bounds(), Rect::from_ltrb(5.0, 5.0, 15.0, 15.0));
        assert_eq!(shifted.shape(), PathShape::Rect);

        let scaled = path.transform(&Matrix::scale(2.0, 3.0));
        assert_eq!(scaled.bounds(), Rect::from_ltrb(0.0, 0.0, 20.0, 30.0));
    }

    #[test]
    fn test_flatten_reuses_cache() {
        let mut path = Path::new();
        path.add_circle(Point::new(0.0, 0.0), 10.0);
        let mut tess = TessellationCache::new();

        let a = path.flatten(2.0, &mut tess);
        let b = path.flatten(2.1, &mut tess);
        assert!(Rc::ptr_eq(&a, &b));

        let c = path.flatten(3.0, &mut tess);
        assert!(!Rc::ptr_eq(&a, &c));

        path.line_to(20.0, 20.0);
        let d = path.flatten(3.0, &mut tess);
        assert!(!Rc::ptr_eq(&c, &d));
    }

    #[test]
    fn test_conic_endpoints() {
        let mut path = Path::new();
        path.move_to(10.0, 0.0);
        path.conic_to(10.0, 10.0, 0.0, 10.0, std::f32::consts::FRAC_1_SQRT_2);
        let end = path.current_point();
        assert!((end.x - 0.0).abs() < 1e-4 && (end.y - 10.0).abs() < 1e-4);
        assert_eq!(path.commands().len(), 1 + 8);
    }
}
