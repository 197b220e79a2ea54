//! Adaptive cubic Bézier flattening with a frame-expiring cache
//!
//! A segment is accepted once the perpendicular deviation of both control
//! points from the chord is small relative to the chord length:
//!
//! ```text
//! (d2 + d3)² <= tess_tol * (dx² + dy²)
//! ```
//!
//! Otherwise it is split in half (De Casteljau) until a depth of 10.
//! Results are stored relative to the first control point, so translated
//! copies of a curve share one cache entry.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use verso_core::Point;

/// Frames an unused entry survives before eviction
pub const DEFAULT_TTL_FRAMES: u64 = 5;

/// Maximum De Casteljau subdivision depth
pub const MAX_SUBDIVISION_LEVEL: u32 = 10;

/// Cache key: control points relative to the first one, plus tolerance (as bits)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TessellationKey {
    coords: [u32; 6],
    tess_tol: u32,
}

impl TessellationKey {
    fn new(p1: Point, p2: Point, p3: Point, p4: Point, tess_tol: f32) -> Self {
        let rel = [p2 - p1, p3 - p1, p4 - p1];
        Self {
            coords: [
                rel[0].x.to_bits(),
                rel[0].y.to_bits(),
                rel[1].x.to_bits(),
                rel[1].y.to_bits(),
                rel[2].x.to_bits(),
                rel[2].y.to_bits(),
            ],
            tess_tol: tess_tol.to_bits(),
        }
    }
}

#[derive(Debug)]
struct TessellationEntry {
    points: Rc<[Point]>,
    expires_at: u64,
}

/// Memoized curve flattening keyed by curve shape and tolerance
#[derive(Debug)]
pub struct TessellationCache {
    entries: FxHashMap<TessellationKey, TessellationEntry>,
    frame: u64,
    ttl_frames: u64,
}

impl Default for TessellationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TessellationCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_FRAMES)
    }

    pub fn with_ttl(ttl_frames: u64) -> Self {
        Self {
            entries: FxHashMap::default(),
            frame: 0,
            ttl_frames,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Advance the frame counter and drop entries whose ttl has lapsed
    pub fn tick_next_frame(&mut self) {
        self.frame += 1;
        let frame = self.frame;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at >= frame);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(
                "Tessellation cache: evicted {} entries at frame {}",
                evicted,
                frame
            );
        }
    }

    /// Flatten the cubic `p1..p4`, returning points relative to `p1`
    ///
    /// The start point is not included; the last point is always the end
    /// point of the curve.
    pub fn tessellate_bezier(
        &mut self,
        p1: Point,
        p2: Point,
        p3: Point,
        p4: Point,
        tess_tol: f32,
    ) -> Rc<[Point]> {
        let key = TessellationKey::new(p1, p2, p3, p4, tess_tol);
        let expires_at = self.frame + self.ttl_frames;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.expires_at = expires_at;
            return entry.points.clone();
        }

        let points: Rc<[Point]> = subdivide(p2 - p1, p3 - p1, p4 - p1, tess_tol).into();
        self.entries.insert(
            key,
            TessellationEntry {
                points: points.clone(),
                expires_at,
            },
        );
        points
    }
}

/// Iterative adaptive subdivision of the cubic `(0,0), p2, p3, p4`
fn subdivide(p2: Point, p3: Point, p4: Point, tess_tol: f32) -> Vec<Point> {
    let mut points = Vec::new();
    let mut stack: Vec<([Point; 4], u32)> = vec![([Point::ZERO, p2, p3, p4], 0)];

    while let Some(([a, b, c, d], level)) = stack.pop() {
        let dx = d.x - a.x;
        let dy = d.y - a.y;
        let d2 = ((b.x - d.x) * dy - (b.y - d.y) * dx).abs();
        let d3 = ((c.x - d.x) * dy - (c.y - d.y) * dx).abs();

        if (d2 + d3) * (d2 + d3) <= tess_tol * (dx * dx + dy * dy)
            || level >= MAX_SUBDIVISION_LEVEL
        {
            points.push(d);
            continue;
        }

        let ab = a.lerp(b, 0.5);
        let bc = b.lerp(c, 0.5);
        let cd = c.lerp(d, 0.5);
        let abc = ab.lerp(bc, 0.5);
        let bcd = bc.lerp(cd, 0.5);
        let mid = abc.lerp(bcd, 0.5);

        // Second half first so the first half pops next
        stack.push(([mid, bcd, cd, d], level + 1));
        stack.push(([a, ab, abc, mid], level + 1));
    }

    points
}
