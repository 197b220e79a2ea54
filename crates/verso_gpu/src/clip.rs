//! Clip stack and clip reduction
//!
//! Every clip is tessellated into a [`ClipElement`] carrying the running
//! intersection of all bounds below it. Before each draw the stack is reduced
//! against the draw's bounds:
//!
//! ```text
//! no clip                      → scissor = layer bounds
//! only axis-aligned rects      → scissor = layer ∩ stack bound
//! otherwise                    → scissor = layer ∩ stack bound ∩ query,
//!                                masks   = non-rect elements not containing it
//! ```
//!
//! Mask elements are rendered into the stencil buffer; everything else is
//! handled by the scissor alone.

use std::rc::Rc;

use smallvec::SmallVec;
use verso_core::{Matrix, Rect};
use verso_paint::{Mesh, Path, TessellationCache};

pub const INVALID_GEN_ID: u32 = 0;
pub const EMPTY_GEN_ID: u32 = 1;
pub const WIDE_OPEN_GEN_ID: u32 = 2;

/// Source of strictly increasing clip generation ids
#[derive(Debug)]
pub struct ClipGenIds {
    last: u32,
}

impl Default for ClipGenIds {
    fn default() -> Self {
        Self {
            last: WIDE_OPEN_GEN_ID,
        }
    }
}

impl ClipGenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        self.last += 1;
        self.last
    }
}

/// One tessellated clip shape
#[derive(Clone, Debug)]
pub struct ClipElement {
    save_count: usize,
    mesh: Rc<Mesh>,
    convex: bool,
    rect: Option<Rect>,
    gen_id: u32,
    intersection_of_rects: bool,
    bound: Rect,
    inverse: Option<Matrix>,
}

impl ClipElement {
    fn new(
        save_count: usize,
        path: &Path,
        matrix: &Matrix,
        scale: f32,
        tess: &mut TessellationCache,
    ) -> Self {
        let cache = path.flatten(scale, tess);
        let fill = cache.fill_mesh(0.0);
        let mesh = Rc::new(fill.mesh.transform(matrix));

        let rect = if fill.convex && matrix.rect_stays_rect() && is_axis_aligned_quad(&mesh) {
            Some(mesh.bounds())
        } else {
            None
        };

        let inverse = if matrix.is_identity() {
            None
        } else {
            matrix.invert()
        };

        Self {
            save_count,
            mesh,
            convex: fill.convex,
            rect,
            gen_id: INVALID_GEN_ID,
            intersection_of_rects: false,
            bound: Rect::ZERO,
            inverse,
        }
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn is_rect(&self) -> bool {
        self.rect.is_some()
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_convex(&self) -> bool {
        self.convex
    }

    pub fn gen_id(&self) -> u32 {
        debug_assert_ne!(self.gen_id, INVALID_GEN_ID);
        self.gen_id
    }

    /// Intersection of this clip with every clip below it
    pub fn bound(&self) -> Rect {
        self.bound
    }

    pub fn is_empty(&self) -> bool {
        self.gen_id() == EMPTY_GEN_ID
    }

    pub fn is_intersection_of_rects(&self) -> bool {
        self.intersection_of_rects
    }

    fn set_empty(&mut self) {
        self.gen_id = EMPTY_GEN_ID;
        self.intersection_of_rects = false;
        self.bound = Rect::ZERO;
    }

    fn update_bound_and_gen_id(&mut self, prior: Option<(Rect, bool)>, ids: &mut ClipGenIds) {
        self.gen_id = ids.next_id();
        self.intersection_of_rects = false;

        match self.rect {
            Some(rect) => {
                self.bound = rect;
                if prior.map_or(true, |(_, rects)| rects) {
                    self.intersection_of_rects = true;
                }
            }
            None => self.bound = self.mesh.bounds(),
        }

        if let Some((prior_bound, _)) = prior {
            self.bound = self.bound.intersect(&prior_bound);
        }
        if self.bound.is_empty() {
            self.set_empty();
        }
    }

    /// Whether `rect` lies entirely inside the clip shape
    pub fn contains(&self, rect: &Rect) -> bool {
        if let Some(clip) = &self.rect {
            return clip.contains_rect(rect);
        }
        if !self.convex {
            return false;
        }

        let local = match (&self.inverse, self.mesh.matrix()) {
            (Some(inverse), Some(_)) => inverse.map_rect(rect),
            _ => *rect,
        };
        convex_contains(self.mesh.vertices(), &local)
    }
}

fn is_axis_aligned_quad(mesh: &Mesh) -> bool {
    const EPS: f32 = 1e-6;
    let v = mesh.vertices();
    if v.len() != 4 {
        return false;
    }
    let near = |a: f32, b: f32| (a - b).abs() < EPS;

    (near(v[0].x, v[1].x) && near(v[1].y, v[2].y) && near(v[2].x, v[3].x) && near(v[3].y, v[0].y))
        || (near(v[0].y, v[1].y)
            && near(v[1].x, v[2].x)
            && near(v[2].y, v[3].y)
            && near(v[3].x, v[0].x))
}

/// Every corner of `rect` on the inner side of every polygon edge
fn convex_contains(vertices: &[verso_core::Point], rect: &Rect) -> bool {
    if vertices.len() <= 2 {
        return false;
    }

    // Orientation of the polygon; either winding is accepted
    let n = vertices.len();
    let twice_area: f32 = (0..n)
        .map(|i| vertices[i].cross(vertices[(i + 1) % n]))
        .sum();
    let orientation = if twice_area < 0.0 { -1.0 } else { 1.0 };

    let corners = [
        rect.top_left(),
        rect.top_right(),
        rect.bottom_right(),
        rect.bottom_left(),
    ];
    for i in 0..n {
        let p0 = vertices[i];
        let p1 = vertices[(i + 1) % n];
        let edge = p1 - p0;
        if edge.x == 0.0 && edge.y == 0.0 {
            continue;
        }
        if corners
            .iter()
            .any(|&c| edge.cross(c - p0) * orientation < 0.0)
        {
            return false;
        }
    }
    true
}

/// Clips of one render layer, grouped by save depth
#[derive(Debug, Default)]
pub struct ClipStack {
    elements: Vec<ClipElement>,
    save_count: usize,
}

impl ClipStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[ClipElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn save(&mut self) {
        self.save_count += 1;
    }

    /// Pop every clip pushed since the matching `save`
    pub fn restore(&mut self) {
        self.save_count = self.save_count.saturating_sub(1);
        while self
            .elements
            .last()
            .is_some_and(|last| last.save_count > self.save_count)
        {
            self.elements.pop();
        }
    }

    /// Intersect the clip with `path` placed under `matrix`
    ///
    /// `scale` is the device scale used to flatten the path.
    pub fn clip_path(
        &mut self,
        path: &Path,
        matrix: &Matrix,
        scale: f32,
        tess: &mut TessellationCache,
        ids: &mut ClipGenIds,
    ) {
        let element = ClipElement::new(self.save_count, path, matrix, scale, tess);
        self.push_element(element, ids);
    }

    fn push_element(&mut self, mut element: ClipElement, ids: &mut ClipGenIds) {
        let len = self.elements.len();
        let prior_prior = (len > 1)
            .then(|| &self.elements[len - 2])
            .map(|e| (e.bound(), e.is_intersection_of_rects()));

        if let Some(prior) = self.elements.last_mut() {
            if prior.is_empty() {
                return;
            }

            // Elements across a save boundary are never merged
            if prior.save_count == self.save_count {
                if let (Some(prior_rect), Some(rect)) = (prior.rect, element.rect) {
                    let isect = prior_rect.intersect(&rect);
                    if isect.is_empty() {
                        prior.set_empty();
                        return;
                    }
                    prior.rect = Some(isect);
                    prior.update_bound_and_gen_id(prior_prior, ids);
                    return;
                }

                let bound = element.rect.unwrap_or_else(|| element.mesh.bounds());
                if !prior.bound().overlaps(&bound) {
                    prior.set_empty();
                    return;
                }
            }
        }

        let prior = self
            .elements
            .last()
            .map(|e| (e.bound(), e.is_intersection_of_rects()));
        element.update_bound_and_gen_id(prior, ids);
        self.elements.push(element);
    }

    /// Bound of the whole stack and whether it is a pure rect intersection
    pub fn bounds(&self) -> Option<(Rect, bool)> {
        self.elements
            .last()
            .map(|e| (e.bound(), e.is_intersection_of_rects()))
    }
}

/// Stencil mask shape selected by clip reduction
#[derive(Clone, Debug)]
pub struct MaskElement {
    pub mesh: Rc<Mesh>,
    pub gen_id: u32,
}

/// Scissor plus the masks needed to clip one draw
#[derive(Clone, Debug)]
pub struct ReducedClip {
    pub scissor: Rect,
    pub mask_elements: SmallVec<[MaskElement; 4]>,
}

impl ReducedClip {
    pub fn new(stack: &ClipStack, layer_bounds: Rect, query_bounds: Rect) -> Self {
        let mut clip = ReducedClip {
            scissor: layer_bounds,
            mask_elements: SmallVec::new(),
        };

        let Some((stack_bounds, intersection_of_rects)) = stack.bounds() else {
            return clip;
        };

        let stack_bounds = layer_bounds.intersect(&stack_bounds);
        if !stack_bounds.overlaps(&query_bounds) {
            clip.scissor = Rect::ZERO;
            return clip;
        }
        if intersection_of_rects {
            clip.scissor = stack_bounds;
            return clip;
        }

        let query = stack_bounds.intersect(&query_bounds);
        if query.is_empty() {
            clip.scissor = Rect::ZERO;
            return clip;
        }

        clip.scissor = query;
        for element in stack.elements() {
            if element.is_rect() || element.contains(&query) {
                continue;
            }
            clip.mask_elements.push(MaskElement {
                mesh: element.mesh().clone(),
                gen_id: element.gen_id(),
            });
        }
        clip
    }

    /// Nothing survives the clip
    pub fn is_empty(&self) -> bool {
        self.scissor.is_empty()
    }

    /// Generation of the mask set; wide-open when no mask is needed
    pub fn mask_gen_id(&self) -> u32 {
        self.mask_elements
            .last()
            .map_or(WIDE_OPEN_GEN_ID, |element| element.gen_id)
    }
}
