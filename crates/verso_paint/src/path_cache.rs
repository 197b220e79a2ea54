//! Flattened path geometry and the fill/stroke meshes derived from it
//!
//! A [`PathCache`] is built by [`Path::flatten`](crate::path::Path::flatten)
//! for one scale bucket. It stores the flattened points of every subpath and
//! memoizes the last fill, AA fringe and stroke meshes computed from them.
//!
//! ```text
//! Path ──flatten(scale)──► PathCache ──fill_mesh()────► FillMesh { mesh, convex, fringe }
//!                                    └─stroke_mesh(p)─► Rc<Mesh>   (triangle strip)
//! ```

use std::cell::RefCell;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::rc::Rc;

use verso_core::Point;

use crate::mesh::Mesh;
use crate::paint::{StrokeCap, StrokeJoin};
use crate::path::{PathShape, PathWinding};
use crate::stroke::{self, StrokeVertices};
use crate::tessellation::TessellationCache;

/// Miter limit used for the anti-aliasing fringe around concave fills
const FRINGE_MITER_LIMIT: f32 = 2.4;

// ─────────────────────────────────────────────────────────────────────────────
// Points
// ─────────────────────────────────────────────────────────────────────────────

/// Per-point join classification
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointFlags(u8);

impl PointFlags {
    pub const NONE: PointFlags = PointFlags(0);
    pub const CORNER: PointFlags = PointFlags(0x01);
    pub const LEFT: PointFlags = PointFlags(0x02);
    pub const BEVEL: PointFlags = PointFlags(0x04);
    pub const INNER_BEVEL: PointFlags = PointFlags(0x08);

    pub fn contains(self, other: PointFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: PointFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for PointFlags {
    type Output = PointFlags;

    fn bitor(self, rhs: PointFlags) -> PointFlags {
        PointFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PointFlags {
    fn bitor_assign(&mut self, rhs: PointFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PointFlags {
    type Output = PointFlags;

    fn bitand(self, rhs: PointFlags) -> PointFlags {
        PointFlags(self.0 & rhs.0)
    }
}

/// Flattened point with its outgoing direction and miter extrusion
#[derive(Clone, Copy, Debug, Default)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
    /// Direction to the next point (normalized once joins are computed)
    pub dx: f32,
    pub dy: f32,
    /// Length of the outgoing segment
    pub len: f32,
    /// Averaged miter direction, scaled by 1/|dm|²
    pub dmx: f32,
    pub dmy: f32,
    pub flags: PointFlags,
}

impl PathPoint {
    fn new(x: f32, y: f32, flags: PointFlags) -> Self {
        Self {
            x,
            y,
            flags,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SubPath {
    first: usize,
    count: usize,
    closed: bool,
    ifill: usize,
    nfill: usize,
    istroke: usize,
    nstroke: usize,
    winding: PathWinding,
    convex: bool,
}

impl SubPath {
    fn new(first: usize) -> Self {
        Self {
            first,
            count: 0,
            closed: false,
            ifill: 0,
            nfill: 0,
            istroke: 0,
            nstroke: 0,
            winding: PathWinding::CounterClockwise,
            convex: false,
        }
    }
}

/// One flattened subpath, for inspection
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
    pub closed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Meshes
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters that define a stroke mesh
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeParams {
    /// Half of the stroke width, in path units
    pub half_width: f32,
    pub cap: StrokeCap,
    pub join: StrokeJoin,
    pub miter_limit: f32,
}

/// Fill geometry for a path
#[derive(Clone, Debug)]
pub struct FillMesh {
    /// Triangle fan per subpath
    pub mesh: Rc<Mesh>,
    /// Single convex subpath: can be drawn without stencil
    pub convex: bool,
    /// Anti-aliasing border strip, present for stencilled fills only
    pub fringe: Option<Rc<Mesh>>,
}

#[derive(Debug, Default)]
struct CacheState {
    paths: Vec<SubPath>,
    points: Vec<PathPoint>,
    fill: Option<(Rc<Mesh>, bool)>,
    fringe: Option<(f32, Rc<Mesh>)>,
    stroke: Option<(StrokeParams, Rc<Mesh>)>,
}

/// Flattened path for one scale bucket
#[derive(Debug)]
pub struct PathCache {
    scale: f32,
    version: u64,
    shape: PathShape,
    dist_tol: f32,
    tess_tol: f32,
    state: RefCell<CacheState>,
}

impl PathCache {
    pub(crate) fn new(scale: f32, version: u64, shape: PathShape) -> Self {
        Self {
            scale,
            version,
            shape,
            dist_tol: 0.01 / scale,
            tess_tol: 0.25 / scale,
            state: RefCell::new(CacheState::default()),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn tess_tol(&self) -> f32 {
        self.tess_tol
    }

    /// Whether this cache still describes a path at `version` and `scale`
    pub fn can_reuse(&self, scale: f32, version: u64) -> bool {
        self.scale == scale && self.version == version
    }

    // ─────────────────────────────────────────────────────────────────────
    // Building (only while the cache is uniquely owned)
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn add_path(&mut self) {
        let state = self.state.get_mut();
        let first = state.points.len();
        state.paths.push(SubPath::new(first));
    }

    pub(crate) fn add_point(&mut self, x: f32, y: f32, flags: PointFlags) {
        if self.state.get_mut().paths.is_empty() {
            self.add_path();
            self.add_point(0.0, 0.0, PointFlags::CORNER);
        }

        let dist_tol = self.dist_tol;
        let state = self.state.get_mut();
        let Some(path) = state.paths.last_mut() else {
            return;
        };
        if path.count > 0 {
            if let Some(last) = state.points.last_mut() {
                if stroke::pt_equals(last.x, last.y, x, y, dist_tol) {
                    last.flags |= flags;
                    return;
                }
            }
        }

        state.points.push(PathPoint::new(x, y, flags));
        path.count += 1;
    }

    pub(crate) fn tessellate_bezier(
        &mut self,
        tess: &mut TessellationCache,
        c1: Point,
        c2: Point,
        end: Point,
        flags: PointFlags,
    ) {
        let start = self
            .state
            .get_mut()
            .points
            .last()
            .map_or(Point::ZERO, |p| Point::new(p.x, p.y));

        if start == c1 && start == c2 && start == end {
            return;
        }

        let points = tess.tessellate_bezier(start, c1, c2, end, self.tess_tol);
        let last = points.len().saturating_sub(1);
        for (i, p) in points.iter().enumerate() {
            let f = if i == last { flags } else { PointFlags::NONE };
            self.add_point(start.x + p.x, start.y + p.y, f);
        }
    }

    pub(crate) fn close_path(&mut self) {
        if let Some(path) = self.state.get_mut().paths.last_mut() {
            path.closed = true;
        }
    }

    pub(crate) fn path_winding(&mut self, winding: PathWinding) {
        if let Some(path) = self.state.get_mut().paths.last_mut() {
            path.winding = winding;
        }
    }

    /// Drop duplicated closing points and apply subpath winding
    pub(crate) fn normalize(&mut self) {
        let dist_tol = self.dist_tol;
        let state = self.state.get_mut();
        for path in state.paths.iter_mut() {
            if path.count <= 1 {
                continue;
            }

            let p0 = state.points[path.first + path.count - 1];
            let p1 = state.points[path.first];
            if stroke::pt_equals(p0.x, p0.y, p1.x, p1.y, dist_tol) {
                path.count -= 1;
                path.closed = true;
            }

            if path.count > 2 && path.winding == PathWinding::Clockwise {
                state.points[path.first..path.first + path.count].reverse();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    /// Flattened subpaths with their closed flags
    pub fn contours(&self) -> Vec<Contour> {
        let state = self.state.borrow();
        state
            .paths
            .iter()
            .map(|path| Contour {
                points: state.points[path.first..path.first + path.count]
                    .iter()
                    .map(|p| Point::new(p.x, p.y))
                    .collect(),
                closed: path.closed,
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fill
    // ─────────────────────────────────────────────────────────────────────

    /// Fill mesh, plus an AA fringe of `fringe` width when the fill is not convex
    pub fn fill_mesh(&self, fringe: f32) -> FillMesh {
        let (mesh, convex) = self.fill_fan();
        let fringe_mesh = if convex || fringe <= 0.0 {
            None
        } else {
            Some(self.fringe_mesh(fringe))
        };
        FillMesh {
            mesh,
            convex,
            fringe: fringe_mesh,
        }
    }

    fn fill_fan(&self) -> (Rc<Mesh>, bool) {
        let mut state = self.state.borrow_mut();
        if let Some((mesh, convex)) = &state.fill {
            return (mesh.clone(), *convex);
        }

        let vertices = Self::expand_fill(&mut state);

        let mut indices = Vec::new();
        for path in state.paths.iter().filter(|p| p.count > 2 && p.nfill > 0) {
            debug_assert!(path.nfill >= 2);
            for j in 2..path.nfill {
                indices.push(path.ifill as u32);
                indices.push((path.ifill + j) as u32);
                indices.push((path.ifill + j - 1) as u32);
            }
        }

        let mut qualifying = state.paths.iter().filter(|p| p.count > 2);
        let convex = match (qualifying.next(), qualifying.next()) {
            (Some(only), None) => only.convex || self.shape != PathShape::Other,
            _ => false,
        };

        let mesh = Rc::new(Mesh::new(None, vertices, indices, None));
        state.fill = Some((mesh.clone(), convex));
        (mesh, convex)
    }

    fn expand_fill(state: &mut CacheState) -> Vec<Point> {
        let CacheState { paths, points, .. } = state;

        for path in paths.iter_mut() {
            if path.count <= 2 {
                continue;
            }
            let range = path.first..path.first + path.count;

            // Unnormalized edge vectors
            let mut ip0 = range.end - 1;
            for ip1 in range.clone() {
                let p1 = points[ip1];
                let p0 = &mut points[ip0];
                p0.dx = p1.x - p0.x;
                p0.dy = p1.y - p0.y;
                ip0 = ip1;
            }

            // Convex when every turn has the same sign (either orientation)
            let mut has_left = false;
            let mut has_right = false;
            let mut ip0 = range.end - 1;
            for ip1 in range.clone() {
                let p0 = points[ip0];
                let p1 = points[ip1];
                let cross = p1.dx * p0.dy - p0.dx * p1.dy;
                if cross < 0.0 {
                    has_right = true;
                } else if cross > 0.0 {
                    has_left = true;
                }
                ip0 = ip1;
            }
            path.convex = !(has_left && has_right);
        }

        let capacity = paths.iter().filter(|p| p.count > 2).map(|p| p.count).sum();
        let mut vertices = Vec::with_capacity(capacity);
        for path in paths.iter_mut() {
            if path.count <= 2 {
                continue;
            }
            path.ifill = vertices.len();
            vertices.extend(
                points[path.first..path.first + path.count]
                    .iter()
                    .map(|p| Point::new(p.x, p.y)),
            );
            path.nfill = vertices.len() - path.ifill;
        }
        vertices
    }

    fn fringe_mesh(&self, fringe: f32) -> Rc<Mesh> {
        if let Some((width, mesh)) = &self.state.borrow().fringe {
            if *width == fringe {
                return mesh.clone();
            }
        }

        let params = StrokeParams {
            half_width: fringe * 0.5,
            cap: StrokeCap::Butt,
            join: StrokeJoin::Miter,
            miter_limit: FRINGE_MITER_LIMIT,
        };
        let mesh = Rc::new(self.build_stroke(&params, |p| p.count > 2));
        self.state.borrow_mut().fringe = Some((fringe, mesh.clone()));
        mesh
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stroke
    // ─────────────────────────────────────────────────────────────────────

    /// Stroke mesh for `params`; recomputed only when the params change
    pub fn stroke_mesh(&self, params: StrokeParams) -> Rc<Mesh> {
        if let Some((last, mesh)) = &self.state.borrow().stroke {
            if *last == params {
                return mesh.clone();
            }
        }

        let mesh = Rc::new(self.build_stroke(&params, |p| p.count > 1));
        self.state.borrow_mut().stroke = Some((params, mesh.clone()));
        mesh
    }

    fn build_stroke(&self, params: &StrokeParams, include: impl Fn(&SubPath) -> bool) -> Mesh {
        let mut state = self.state.borrow_mut();
        let vertices = self.expand_stroke(&mut state, params, &include);

        let mut indices = Vec::new();
        for path in state.paths.iter().filter(|p| include(*p) && p.nstroke > 0) {
            debug_assert!(path.nstroke >= 2);
            let base = path.istroke as u32;
            for j in 2..path.nstroke as u32 {
                if j & 1 == 0 {
                    indices.extend_from_slice(&[base + j - 1, base + j - 2, base + j]);
                } else {
                    indices.extend_from_slice(&[base + j - 2, base + j - 1, base + j]);
                }
            }
        }

        Mesh::new(None, vertices.positions, indices, Some(vertices.uv))
    }

    fn calculate_joins(state: &mut CacheState, w: f32, join: StrokeJoin, miter_limit: f32) {
        let iw = if w > 0.0 { 1.0 / w } else { 0.0 };
        let CacheState { paths, points, .. } = state;

        for path in paths.iter().filter(|p| p.count > 1) {
            let range = path.first..path.first + path.count;

            let mut ip0 = range.end - 1;
            for ip1 in range.clone() {
                let p1 = points[ip1];
                let p0 = &mut points[ip0];
                p0.dx = p1.x - p0.x;
                p0.dy = p1.y - p0.y;
                p0.len = stroke::normalize(&mut p0.dx, &mut p0.dy);
                ip0 = ip1;
            }

            let mut ip0 = range.end - 1;
            for ip1 in range.clone() {
                let p0 = points[ip0];
                let mut p1 = points[ip1];
                let dlx0 = p0.dy;
                let dly0 = -p0.dx;
                let dlx1 = p1.dy;
                let dly1 = -p1.dx;

                p1.dmx = (dlx0 + dlx1) * 0.5;
                p1.dmy = (dly0 + dly1) * 0.5;
                let dmr2 = p1.dmx * p1.dmx + p1.dmy * p1.dmy;
                if dmr2 > 0.000001 {
                    let scale = (1.0 / dmr2).min(600.0);
                    p1.dmx *= scale;
                    p1.dmy *= scale;
                }

                // Keep only the corner flag
                p1.flags = p1.flags & PointFlags::CORNER;

                let cross = p1.dx * p0.dy - p0.dx * p1.dy;
                if cross > 0.0 {
                    p1.flags |= PointFlags::LEFT;
                }

                let limit = (p0.len.min(p1.len) * iw).max(1.01);
                if dmr2 * limit * limit < 1.0 {
                    p1.flags |= PointFlags::INNER_BEVEL;
                }

                if p1.flags.contains(PointFlags::CORNER)
                    && (join == StrokeJoin::Bevel
                        || join == StrokeJoin::Round
                        || dmr2 * miter_limit * miter_limit < 1.0)
                {
                    p1.flags |= PointFlags::BEVEL;
                }

                points[ip1] = p1;
                ip0 = ip1;
            }
        }
    }

    fn expand_stroke(
        &self,
        state: &mut CacheState,
        params: &StrokeParams,
        include: &impl Fn(&SubPath) -> bool,
    ) -> StrokeVertices {
        let w = params.half_width;
        Self::calculate_joins(state, w, params.join, params.miter_limit);

        let ncap = if params.cap == StrokeCap::Round || params.join == StrokeJoin::Round {
            stroke::curve_divs(w, std::f32::consts::PI, self.tess_tol)
        } else {
            0
        };

        let CacheState { paths, points, .. } = state;
        let capacity = paths
            .iter()
            .filter(|p| include(*p))
            .map(|p| p.count * 2 + 4)
            .sum();
        let mut dst = StrokeVertices::with_capacity(capacity);

        for path in paths.iter_mut() {
            if !include(&*path) {
                continue;
            }
            path.istroke = dst.len();

            let (mut ip0, mut ip1, s, e) = if path.closed {
                (path.first + path.count - 1, path.first, 0, path.count)
            } else {
                (path.first, path.first + 1, 1, path.count - 1)
            };

            if !path.closed {
                let p0 = &points[ip0];
                match params.cap {
                    StrokeCap::Butt => stroke::butt_cap_start(&mut dst, p0, p0.dx, p0.dy, w, 0.0),
                    StrokeCap::Square => stroke::butt_cap_start(&mut dst, p0, p0.dx, p0.dy, w, w),
                    StrokeCap::Round => {
                        stroke::round_cap_start(&mut dst, p0, p0.dx, p0.dy, w, ncap)
                    }
                }
            }

            for _ in s..e {
                let p0 = &points[ip0];
                let p1 = &points[ip1];
                if p1.flags.intersects(PointFlags::BEVEL | PointFlags::INNER_BEVEL) {
                    if params.join == StrokeJoin::Round {
                        stroke::round_join(&mut dst, p0, p1, w, w, ncap);
                    } else {
                        stroke::bevel_join(&mut dst, p0, p1, w, w);
                    }
                } else {
                    dst.positions
                        .push(Point::new(p1.x + p1.dmx * w, p1.y + p1.dmy * w));
                    dst.uv.push(Point::new(0.0, 1.0));
                    dst.positions
                        .push(Point::new(p1.x - p1.dmx * w, p1.y - p1.dmy * w));
                    dst.uv.push(Point::new(1.0, 1.0));
                }
                ip0 = ip1;
                ip1 += 1;
            }

            if path.closed {
                dst.repeat(path.istroke);
                dst.repeat(path.istroke + 1);
            } else {
                let p0 = &points[ip0];
                let p1 = &points[ip1];
                match params.cap {
                    StrokeCap::Butt => stroke::butt_cap_end(&mut dst, p1, p0.dx, p0.dy, w, 0.0),
                    StrokeCap::Square => stroke::butt_cap_end(&mut dst, p1, p0.dx, p0.dy, w, w),
                    StrokeCap::Round => stroke::round_cap_end(&mut dst, p1, p0.dx, p0.dy, w, ncap),
                }
            }

            path.nstroke = dst.len() - path.istroke;
        }

        debug_assert_eq!(dst.positions.len(), dst.uv.len());
        dst
    }
}
