//! Stroke geometry helpers: caps, joins and point utilities
//!
//! Every helper appends vertex *pairs* (left, right) to a [`StrokeVertices`]
//! strip. `u` is 0 on the left edge, 1 on the right edge and 0.5 on the
//! centre line, which the stroke shader uses for edge coverage.

use std::f32::consts::PI;

use verso_core::Point;

use crate::path_cache::{PathPoint, PointFlags};

const U_LEFT: f32 = 0.0;
const U_RIGHT: f32 = 1.0;
const U_CENTER: f32 = 0.5;

/// Triangle-strip vertices with per-vertex UVs
#[derive(Clone, Debug, Default)]
pub struct StrokeVertices {
    pub positions: Vec<Point>,
    pub uv: Vec<Point>,
}

impl StrokeVertices {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            uv: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn push(&mut self, x: f32, y: f32, u: f32) {
        self.positions.push(Point::new(x, y));
        self.uv.push(Point::new(u, 1.0));
    }

    /// Re-emit the vertex at `index` (used to close stroke rings)
    pub fn repeat(&mut self, index: usize) {
        let p = self.positions[index];
        let uv = self.uv[index];
        self.positions.push(p);
        self.uv.push(uv);
    }
}

/// Component-wise early reject, then squared distance below `tol²`
pub fn pt_equals(x1: f32, y1: f32, x2: f32, y2: f32, tol: f32) -> bool {
    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx <= -tol || dx >= tol || dy <= -tol || dy >= tol {
        return false;
    }
    dx * dx + dy * dy < tol * tol
}

/// Normalize `(x, y)` in place when it is not degenerate; returns the length
pub fn normalize(x: &mut f32, y: &mut f32) -> f32 {
    let d = (*x * *x + *y * *y).sqrt();
    if d > 1e-6 {
        let id = 1.0 / d;
        *x *= id;
        *y *= id;
    }
    d
}

/// Number of segments approximating an `arc` of radius `r` within `tol`
pub fn curve_divs(r: f32, arc: f32, tol: f32) -> usize {
    let da = (r / (r + tol)).acos() * 2.0;
    let divs = (arc / da).ceil();
    if divs.is_finite() && divs > 2.0 {
        divs as usize
    } else {
        2
    }
}

pub fn butt_cap_start(dst: &mut StrokeVertices, p: &PathPoint, dx: f32, dy: f32, w: f32, d: f32) {
    let px = p.x - dx * d;
    let py = p.y - dy * d;
    let dlx = dy;
    let dly = -dx;
    dst.push(px + dlx * w, py + dly * w, U_LEFT);
    dst.push(px - dlx * w, py - dly * w, U_RIGHT);
}

pub fn butt_cap_end(dst: &mut StrokeVertices, p: &PathPoint, dx: f32, dy: f32, w: f32, d: f32) {
    let px = p.x + dx * d;
    let py = p.y + dy * d;
    let dlx = dy;
    let dly = -dx;
    dst.push(px + dlx * w, py + dly * w, U_LEFT);
    dst.push(px - dlx * w, py - dly * w, U_RIGHT);
}

pub fn round_cap_start(
    dst: &mut StrokeVertices,
    p: &PathPoint,
    dx: f32,
    dy: f32,
    w: f32,
    ncap: usize,
) {
    let (px, py) = (p.x, p.y);
    let dlx = dy;
    let dly = -dx;
    let steps = ncap.saturating_sub(1).max(1) as f32;

    for i in 0..ncap {
        let a = i as f32 / steps * PI;
        let ax = a.cos() * w;
        let ay = a.sin() * w;
        dst.push(px - dlx * ax - dx * ay, py - dly * ax - dy * ay, U_LEFT);
        dst.push(px, py, U_CENTER);
    }
    dst.push(px + dlx * w, py + dly * w, U_LEFT);
    dst.push(px - dlx * w, py - dly * w, U_RIGHT);
}

pub fn round_cap_end(
    dst: &mut StrokeVertices,
    p: &PathPoint,
    dx: f32,
    dy: f32,
    w: f32,
    ncap: usize,
) {
    let (px, py) = (p.x, p.y);
    let dlx = dy;
    let dly = -dx;
    let steps = ncap.saturating_sub(1).max(1) as f32;

    dst.push(px + dlx * w, py + dly * w, U_LEFT);
    dst.push(px - dlx * w, py - dly * w, U_RIGHT);
    for i in 0..ncap {
        let a = i as f32 / steps * PI;
        let ax = a.cos() * w;
        let ay = a.sin() * w;
        dst.push(px, py, U_CENTER);
        dst.push(px - dlx * ax + dx * ay, py - dly * ax + dy * ay, U_LEFT);
    }
}

/// Outer corner points on either side of `p1`: the two segment normals when
/// bevelled, otherwise the miter point twice
fn choose_bevel(bevel: bool, p0: &PathPoint, p1: &PathPoint, w: f32) -> (Point, Point) {
    if bevel {
        (
            Point::new(p1.x + p0.dy * w, p1.y - p0.dx * w),
            Point::new(p1.x + p1.dy * w, p1.y - p1.dx * w),
        )
    } else {
        let m = Point::new(p1.x + p1.dmx * w, p1.y + p1.dmy * w);
        (m, m)
    }
}

fn arc_steps(sweep: f32, ncap: usize) -> usize {
    let n = (sweep / PI * ncap as f32).ceil();
    let n = if n.is_finite() && n > 0.0 { n as usize } else { 0 };
    n.clamp(2, ncap.max(2))
}

pub fn round_join(
    dst: &mut StrokeVertices,
    p0: &PathPoint,
    p1: &PathPoint,
    lw: f32,
    rw: f32,
    ncap: usize,
) {
    let dlx0 = p0.dy;
    let dly0 = -p0.dx;
    let dlx1 = p1.dy;
    let dly1 = -p1.dx;
    let inner_bevel = p1.flags.contains(PointFlags::INNER_BEVEL);

    if p1.flags.contains(PointFlags::LEFT) {
        let (l0, l1) = choose_bevel(inner_bevel, p0, p1, lw);
        let a0 = (-dly0).atan2(-dlx0);
        let mut a1 = (-dly1).atan2(-dlx1);
        if a1 > a0 {
            a1 -= PI * 2.0;
        }

        dst.push(l0.x, l0.y, U_LEFT);
        dst.push(p1.x - dlx0 * rw, p1.y - dly0 * rw, U_RIGHT);

        let n = arc_steps(a0 - a1, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            dst.push(p1.x, p1.y, U_CENTER);
            dst.push(p1.x + a.cos() * rw, p1.y + a.sin() * rw, U_RIGHT);
        }

        dst.push(l1.x, l1.y, U_LEFT);
        dst.push(p1.x - dlx1 * rw, p1.y - dly1 * rw, U_RIGHT);
    } else {
        let (r0, r1) = choose_bevel(inner_bevel, p0, p1, -rw);
        let a0 = dly0.atan2(dlx0);
        let mut a1 = dly1.atan2(dlx1);
        if a1 < a0 {
            a1 += PI * 2.0;
        }

        dst.push(p1.x + dlx0 * lw, p1.y + dly0 * lw, U_LEFT);
        dst.push(r0.x, r0.y, U_RIGHT);

        let n = arc_steps(a1 - a0, ncap);
        for i in 0..n {
            let u = i as f32 / (n - 1) as f32;
            let a = a0 + u * (a1 - a0);
            dst.push(p1.x + a.cos() * lw, p1.y + a.sin() * lw, U_LEFT);
            dst.push(p1.x, p1.y, U_CENTER);
        }

        dst.push(p1.x + dlx1 * lw, p1.y + dly1 * lw, U_LEFT);
        dst.push(r1.x, r1.y, U_RIGHT);
    }
}

pub fn bevel_join(dst: &mut StrokeVertices, p0: &PathPoint, p1: &PathPoint, lw: f32, rw: f32) {
    let dlx0 = p0.dy;
    let dly0 = -p0.dx;
    let dlx1 = p1.dy;
    let dly1 = -p1.dx;
    let inner_bevel = p1.flags.contains(PointFlags::INNER_BEVEL);
    let bevel = p1.flags.contains(PointFlags::BEVEL);

    if p1.flags.contains(PointFlags::LEFT) {
        let (l0, l1) = choose_bevel(inner_bevel, p0, p1, lw);

        dst.push(l0.x, l0.y, U_LEFT);
        dst.push(p1.x - dlx0 * rw, p1.y - dly0 * rw, U_RIGHT);

        if bevel {
            dst.push(l0.x, l0.y, U_LEFT);
            dst.push(p1.x - dlx0 * rw, p1.y - dly0 * rw, U_RIGHT);
            dst.push(l1.x, l1.y, U_LEFT);
            dst.push(p1.x - dlx1 * rw, p1.y - dly1 * rw, U_RIGHT);
        } else {
            let rx0 = p1.x - p1.dmx * rw;
            let ry0 = p1.y - p1.dmy * rw;
            dst.push(p1.x, p1.y, U_CENTER);
            dst.push(p1.x - dlx0 * rw, p1.y - dly0 * rw, U_RIGHT);
            dst.push(rx0, ry0, U_RIGHT);
            dst.push(rx0, ry0, U_RIGHT);
            dst.push(p1.x, p1.y, U_CENTER);
            dst.push(p1.x - dlx1 * rw, p1.y - dly1 * rw, U_RIGHT);
        }

        dst.push(l1.x, l1.y, U_LEFT);
        dst.push(p1.x - dlx1 * rw, p1.y - dly1 * rw, U_RIGHT);
    } else {
        let (r0, r1) = choose_bevel(inner_bevel, p0, p1, -rw);

        dst.push(p1.x + dlx0 * lw, p1.y + dly0 * lw, U_LEFT);
        dst.push(r0.x, r0.y, U_RIGHT);

        if bevel {
            dst.push(p1.x + dlx0 * lw, p1.y + dly0 * lw, U_LEFT);
            dst.push(r0.x, r0.y, U_RIGHT);
            dst.push(p1.x + dlx1 * lw, p1.y + dly1 * lw, U_LEFT);
            dst.push(r1.x, r1.y, U_RIGHT);
        } else {
            let lx0 = p1.x + p1.dmx * lw;
            let ly0 = p1.y + p1.dmy * lw;
            dst.push(p1.x + dlx0 * lw, p1.y + dly0 * lw, U_LEFT);
            dst.push(p1.x, p1.y, U_CENTER);
            dst.push(lx0, ly0, U_LEFT);
            dst.push(lx0, ly0, U_LEFT);
            dst.push(p1.x + dlx1 * lw, p1.y + dly1 * lw, U_LEFT);
            dst.push(p1.x, p1.y, U_CENTER);
        }

        dst.push(p1.x + dlx1 * lw, p1.y + dly1 * lw, U_LEFT);
        dst.push(r1.x, r1.y, U_RIGHT);
    }
}
