//! Picture flusher
//!
//! Replays a [`Picture`] into a tree of [`RenderLayer`]s and then walks the
//! tree depth-first, turning it into [`Directive`]s:
//!
//! ```text
//! Picture ─replay─▶ root layer ─┬─ draws ...
//!                               ├─ Layer(child) ─▶ child draws ...
//!                               └─ draws ...
//!
//! emit(layer):  for each cmd
//!                 Layer(child) → AllocateTarget, emit(child)
//!                 Draw         → SetTarget (+ClearTarget on first use), DrawMesh
//!                 Scissor      → Enable/DisableScissor
//!               ReleaseTarget for every child
//! ```
//!
//! Child layers are rendered before the parent draw that samples them, so a
//! layer's target is complete by the time it is composited.

use std::rc::Rc;

use slotmap::SlotMap;
use verso_core::{Color, Matrix, Point, Rect};
use verso_paint::{
    DrawCmd, FilterMode, Image, ImageFilter, Mesh, Paint, PaintingStyle, Path, Picture,
    StrokeParams, TessellationCache, TextBlob,
};

use crate::blur::{adjust_sigma, KernelCache};
use crate::clip::{ClipGenIds, ReducedClip, WIDE_OPEN_GEN_ID};
use crate::command::{CommandBuffer, Directive, DrawMesh, RenderTargetId, TargetDescriptor};
use crate::config::RendererConfig;
use crate::error::{RenderError, Result};
use crate::gradient_cache::GradientCache;
use crate::image_mesh::{image_mesh, image_mesh_quad, image_nine_mesh, text_mesh};
use crate::layer::{DrawRecord, LayerKey, RenderCmd, RenderLayer};
use crate::material;
use crate::pool::MeshPool;

/// Geometry ready to be drawn with a paint
#[derive(Clone, Debug)]
enum MeshDraw {
    Fill {
        mesh: Rc<Mesh>,
        fringe: Option<Rc<Mesh>>,
        convex: bool,
    },
    Stroke {
        mesh: Rc<Mesh>,
        alpha: f32,
        stroke_mult: f32,
    },
    Text {
        mesh: Rc<Mesh>,
        bounds: Rect,
        atlas: Image,
        color_glyphs: bool,
    },
}

impl MeshDraw {
    fn bounds(&self) -> Rect {
        match self {
            MeshDraw::Fill { mesh, .. } | MeshDraw::Stroke { mesh, .. } => mesh.bounds(),
            MeshDraw::Text { bounds, .. } => *bounds,
        }
    }

    /// Same geometry rendered as plain coverage
    fn as_coverage(&self) -> MeshDraw {
        match self {
            MeshDraw::Text {
                mesh,
                bounds,
                atlas,
                ..
            } => MeshDraw::Text {
                mesh: mesh.clone(),
                bounds: *bounds,
                atlas: atlas.clone(),
                color_glyphs: false,
            },
            other => other.clone(),
        }
    }
}

/// Corners of `rect` under `matrix`, normalized to `within`
///
/// Ordered top-left, bottom-left, bottom-right, top-right.
fn normalized_corners(rect: &Rect, matrix: &Matrix, within: &Rect) -> [Point; 4] {
    let mut corners = [
        rect.top_left(),
        rect.bottom_left(),
        rect.bottom_right(),
        rect.top_right(),
    ];
    matrix.map_points(&mut corners);
    let (w, h) = (within.width(), within.height());
    corners.map(|p| Point::new((p.x - within.left) / w, (p.y - within.top) / h))
}

fn texture_extent(logical: f32) -> u32 {
    (logical.ceil() as u32).max(1)
}

/// Replays pictures into an abstract command buffer
///
/// One flusher renders into one surface. The tessellation, gradient and
/// blur-kernel caches live as long as the flusher and are shared by every
/// flush.
#[derive(Debug)]
pub struct PictureFlusher {
    config: RendererConfig,
    fringe_width: f32,
    width: u32,
    height: u32,
    tessellator: TessellationCache,
    gradients: GradientCache,
    kernels: KernelCache,
    clip_ids: ClipGenIds,
    mesh_pool: MeshPool,
    layers: SlotMap<LayerKey, RenderLayer>,
    current: LayerKey,
    next_target: u32,
    last_scissor: Option<Rect>,
    last_target: Option<RenderTargetId>,
}

impl PictureFlusher {
    /// Flusher for a `width × height` pixel surface
    pub fn new(config: RendererConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        config.log();

        Ok(Self {
            fringe_width: 1.0 / config.device_pixel_ratio,
            width,
            height,
            tessellator: TessellationCache::with_ttl(config.tessellation_ttl_frames),
            gradients: GradientCache::new(config.gradient_cache_capacity, config.gradient_resolution),
            kernels: KernelCache::new(),
            clip_ids: ClipGenIds::new(),
            mesh_pool: MeshPool::new(),
            layers: SlotMap::with_key(),
            current: LayerKey::default(),
            next_target: 1,
            last_scissor: None,
            last_target: None,
            config,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.config.device_pixel_ratio
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Surface size used by the next flush
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn tessellator(&self) -> &TessellationCache {
        &self.tessellator
    }

    pub fn gradient_cache(&self) -> &GradientCache {
        &self.gradients
    }

    pub fn kernel_cache(&self) -> &KernelCache {
        &self.kernels
    }

    pub fn mesh_pool(&self) -> &MeshPool {
        &self.mesh_pool
    }

    /// Replay `picture` and submit the resulting directives to `buffer`
    ///
    /// Nothing is submitted when the picture is rejected.
    pub fn flush(&mut self, picture: &Picture, buffer: &mut dyn CommandBuffer) -> Result<()> {
        let root = self.reset();
        let result = self.draw_picture(picture, false);

        if result.is_ok() {
            debug_assert!(self.current == root, "layer stack not unwound");
            self.last_target = None;
            self.emit_layer(root, buffer);
            buffer.submit(Directive::DisableScissor);
            tracing::debug!(
                "flushed picture: {} commands, {} layers",
                picture.draw_cmds().len(),
                self.layers.len()
            );
        }

        self.layers.clear();
        self.current = LayerKey::default();
        self.last_scissor = None;
        self.last_target = None;
        self.mesh_pool.reclaim();
        self.tessellator.tick_next_frame();

        result
    }

    fn reset(&mut self) -> LayerKey {
        self.layers.clear();
        self.next_target = 1;
        self.last_scissor = None;

        let bounds = Rect::from_ltwh(
            0.0,
            0.0,
            self.width as f32 * self.fringe_width,
            self.height as f32 * self.fringe_width,
        );
        let root = RenderLayer::new(RenderTargetId::SURFACE, self.width, self.height, bounds);
        self.current = self.layers.insert(root);
        self.current
    }

    // ─────────────────────────────────────────────────────────────────────
    // Layer tree
    // ─────────────────────────────────────────────────────────────────────

    fn layer(&self) -> &RenderLayer {
        &self.layers[self.current]
    }

    fn layer_mut(&mut self) -> &mut RenderLayer {
        &mut self.layers[self.current]
    }

    fn push_draw(&mut self, draw: DrawRecord) {
        self.layers[self.current].add_draw(draw);
    }

    fn alloc_target(&mut self) -> RenderTargetId {
        let id = RenderTargetId(self.next_target);
        self.next_target += 1;
        id
    }

    fn add_child(&mut self, parent: LayerKey, mut layer: RenderLayer) -> LayerKey {
        layer.parent = Some(parent);
        tracing::debug!(
            "layer {:?}: {}x{} at {:?}",
            layer.target,
            layer.width,
            layer.height,
            layer.layer_bounds
        );

        let key = self.layers.insert(layer);
        let parent = &mut self.layers[parent];
        parent.children.push(key);
        parent.draws.push(RenderCmd::Layer(key));
        key
    }

    // ─────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────

    fn save(&mut self) {
        self.layer_mut().save();
    }

    fn save_layer(&mut self, bounds: Rect, paint: &Paint) {
        if bounds.is_empty() {
            tracing::trace!("save_layer with empty bounds {:?}, saving state only", bounds);
            self.save();
            return;
        }

        let parent_key = self.current;
        let parent = self.layer();
        let scale = parent.state().scale() * self.config.device_pixel_ratio;
        let parent_matrix = *parent.state().matrix();
        let parent_bounds = parent.layer_bounds;
        let parent_target = parent.target;

        let width = texture_extent(bounds.width() * scale);
        let height = texture_extent(bounds.height() * scale);
        let target = self.alloc_target();
        let layer = RenderLayer::new(target, width, height, bounds).with_paint(paint.clone());
        let key = self.add_child(parent_key, layer);
        self.current = key;

        match paint.backdrop {
            Some(ImageFilter::Blur { sigma_x, sigma_y }) if !(sigma_x == 0.0 && sigma_y == 0.0) => {
                let uvs = normalized_corners(&bounds, &parent_matrix, &parent_bounds);
                let backdrop = Rc::new(image_mesh_quad(None, uvs, &bounds));
                let draw = material::tex_rt(&self.layers[key], paint, backdrop, parent_target, &mut self.gradients);
                self.push_draw(draw);

                let blurred = self.create_blur_layer(key, sigma_x, sigma_y, key);
                let mesh = Rc::new(image_mesh(None, &Rect::UNIT, &bounds));
                let draw = material::tex_rt(&self.layers[key], paint, mesh, blurred, &mut self.gradients);
                self.push_draw(draw);
            }
            Some(ImageFilter::Matrix {
                matrix,
                filter_mode,
            }) if !matrix.is_identity() => {
                self.layer_mut().filter_mode = filter_mode;

                let uvs = normalized_corners(&bounds, &parent_matrix, &parent_bounds);
                let mut local = Matrix::translation(-bounds.left, -bounds.top);
                local.post_concat(&matrix);
                local.post_translate(bounds.left, bounds.top);

                let backdrop = Rc::new(image_mesh_quad(Some(local), uvs, &bounds));
                let draw = material::tex_rt(&self.layers[key], paint, backdrop, parent_target, &mut self.gradients);
                self.push_draw(draw);
            }
            _ => {}
        }
    }

    fn restore(&mut self) {
        if self.layer_mut().restore() {
            return;
        }

        let child = self.current;
        let Some(parent) = self.layers[child].parent else {
            tracing::warn!("restore on the root layer ignored");
            return;
        };
        self.current = parent;

        let child = &self.layers[child];
        let (bounds, target) = (child.layer_bounds, child.target);
        let paint = child.layer_paint.clone().unwrap_or_default();

        let mesh = image_mesh(Some(*self.layer().state().matrix()), &Rect::UNIT, &bounds);
        if !self.apply_clip(mesh.bounds()) {
            tracing::trace!("layer {:?} clipped away", target);
            return;
        }
        let draw = material::tex_rt(&self.layers[parent], &paint, Rc::new(mesh), target, &mut self.gradients);
        self.push_draw(draw);
    }

    fn update_matrix(&mut self, update: impl FnOnce(&mut Matrix)) {
        let state = self.layer_mut().state_mut();
        let mut matrix = *state.matrix();
        update(&mut matrix);
        state.set_matrix(matrix);
    }

    fn clip_path(&mut self, path: &Path) {
        let state = self.layer().state();
        let matrix = *state.matrix();
        let scale = state.scale() * self.config.device_pixel_ratio;

        let layer = &mut self.layers[self.current];
        layer
            .clip_stack
            .clip_path(path, &matrix, scale, &mut self.tessellator, &mut self.clip_ids);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Clipping
    // ─────────────────────────────────────────────────────────────────────

    fn try_add_scissor(&mut self, scissor: Option<Rect>) {
        if scissor == self.last_scissor {
            return;
        }
        self.layer_mut().draws.push(RenderCmd::Scissor(scissor));
        self.last_scissor = scissor;
    }

    /// Set up scissor and stencil for a draw covering `query`
    ///
    /// Returns false when nothing of the draw survives the clip.
    fn apply_clip(&mut self, query: Rect) -> bool {
        if query.is_empty() {
            return false;
        }

        let layer = self.layer();
        let layer_bounds = layer.layer_bounds;
        let reduced = ReducedClip::new(&layer.clip_stack, layer_bounds, query);
        if reduced.is_empty() {
            return false;
        }

        let scissor = reduced.scissor;
        if scissor == layer_bounds {
            self.try_add_scissor(None);
        } else {
            let (width, height) = (layer.width as f32, layer.height as f32);
            // Target pixels, origin at the bottom-left corner
            let device = Rect::from_ltrb(
                scissor.left - layer_bounds.left,
                layer_bounds.bottom - scissor.bottom,
                scissor.right - layer_bounds.left,
                layer_bounds.bottom - scissor.top,
            )
            .scale(width / layer_bounds.width(), height / layer_bounds.height())
            .round_out()
            .intersect(&Rect::from_ltrb(0.0, 0.0, width, height));
            if device.is_empty() {
                return false;
            }
            self.try_add_scissor(Some(device));
        }

        let mask_gen_id = reduced.mask_gen_id();
        let layer = self.layer();
        if layer.last_clip_gen_id == mask_gen_id && layer.last_clip_bounds == scissor {
            return true;
        }

        if mask_gen_id == WIDE_OPEN_GEN_ID {
            self.layer_mut().ignore_clip = true;
        } else {
            self.layer_mut().ignore_clip = false;

            // Inflated so the clear also covers the anti-aliased edge
            let cover = Rc::new(Mesh::from_rect(&scissor.inflate(self.fringe_width)));
            let draw = material::stencil_clear(self.layer(), cover.clone());
            self.push_draw(draw);
            for element in &reduced.mask_elements {
                let draw = material::stencil0(self.layer(), element.mesh.clone());
                self.push_draw(draw);
                let draw = material::stencil1(self.layer(), cover.clone());
                self.push_draw(draw);
            }
        }

        let layer = self.layer_mut();
        layer.last_clip_gen_id = mask_gen_id;
        layer.last_clip_bounds = scissor;
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Meshes
    // ─────────────────────────────────────────────────────────────────────

    fn draw_mesh(&mut self, paint: &Paint, draw: MeshDraw) {
        match paint.blur_sigma() {
            Some(sigma) => self.draw_with_mask_filter(draw.bounds(), paint, sigma, &draw),
            None => self.emit_mesh_draw(paint, &draw),
        }
    }

    fn emit_mesh_draw(&mut self, paint: &Paint, draw: &MeshDraw) {
        if !self.apply_clip(draw.bounds()) {
            tracing::trace!("draw clipped away: {:?}", draw.bounds());
            return;
        }

        match draw {
            MeshDraw::Fill {
                mesh,
                fringe,
                convex,
            } => {
                if *convex {
                    let draw = material::convex_fill(&self.layers[self.current], paint, mesh.clone(), &mut self.gradients);
                    self.push_draw(draw);
                } else {
                    let draw = material::fill0(self.layer(), mesh.clone());
                    self.push_draw(draw);
                    let draw = material::fill1(&self.layers[self.current], paint, mesh, &mut self.gradients);
                    self.push_draw(draw);
                }

                if let Some(fringe) = fringe {
                    let draw = material::stroke_alpha(
                        &self.layers[self.current],
                        paint,
                        1.0,
                        1.0,
                        fringe.clone(),
                        &mut self.gradients,
                    );
                    self.push_draw(draw);
                    let draw = material::stroke1(self.layer(), fringe.clone());
                    self.push_draw(draw);
                }
            }
            MeshDraw::Stroke {
                mesh,
                alpha,
                stroke_mult,
            } => {
                let draw = material::stroke_alpha(
                    &self.layers[self.current],
                    paint,
                    *alpha,
                    *stroke_mult,
                    mesh.clone(),
                    &mut self.gradients,
                );
                self.push_draw(draw);
                let draw = material::stroke1(self.layer(), mesh.clone());
                self.push_draw(draw);
            }
            MeshDraw::Text {
                mesh,
                atlas,
                color_glyphs,
                ..
            } => {
                let draw = if *color_glyphs {
                    let white = Paint {
                        color: Color::WHITE,
                        ..paint.clone()
                    };
                    material::tex(&self.layers[self.current], &white, mesh.clone(), atlas, &mut self.gradients)
                } else {
                    material::tex_alpha(&self.layers[self.current], paint, mesh.clone(), atlas, &mut self.gradients)
                };
                self.push_draw(draw);
            }
        }
    }

    fn draw_with_mask_filter(&mut self, mesh_bounds: Rect, paint: &Paint, sigma: f32, draw: &MeshDraw) {
        let parent = self.current;
        let layer = self.layer();

        let mut clip_bounds = layer.layer_bounds;
        if let Some((stack_bounds, _)) = layer.clip_stack.bounds() {
            clip_bounds = clip_bounds.intersect(&stack_bounds);
        }
        if clip_bounds.is_empty() {
            tracing::trace!("blurred draw outside the clip");
            return;
        }

        let sigma = layer.state().scale() * sigma;
        if sigma <= 0.0 {
            tracing::trace!("blurred draw with non-positive sigma {}", sigma);
            return;
        }

        let sigma3 = 3.0 * sigma;
        let mask_bounds = mesh_bounds
            .inflate(sigma3)
            .intersect(&clip_bounds.inflate(sigma3));
        if mask_bounds.is_empty() {
            tracing::trace!("blurred draw has an empty mask");
            return;
        }

        let mask = self.create_mask_layer(parent, mask_bounds, paint, draw);
        let blurred = self.create_blur_layer(mask, sigma, sigma, parent);

        let mesh = image_mesh(None, &Rect::UNIT, &mask_bounds);
        if !self.apply_clip(mesh.bounds()) {
            tracing::trace!("blurred draw clipped away");
            return;
        }
        let draw = material::tex_rt(&self.layers[parent], paint, Rc::new(mesh), blurred, &mut self.gradients);
        self.push_draw(draw);
    }

    /// Render the coverage of `draw` into a new child of `parent`
    fn create_mask_layer(&mut self, parent: LayerKey, mask_bounds: Rect, paint: &Paint, draw: &MeshDraw) -> LayerKey {
        let dpr = self.config.device_pixel_ratio;
        let target = self.alloc_target();
        let mut layer = RenderLayer::new(
            target,
            texture_extent(mask_bounds.width() * dpr),
            texture_extent(mask_bounds.height() * dpr),
            mask_bounds,
        )
        .with_filter_mode(FilterMode::Bilinear)
        .without_msaa();
        layer.state_mut().set_matrix(*self.layers[parent].state().matrix());

        let key = self.add_child(parent, layer);
        self.current = key;
        self.emit_mesh_draw(&paint.shape_only(), &draw.as_coverage());
        self.current = parent;
        key
    }

    /// Blur the target of `source` into two new children of `parent`
    ///
    /// Returns the target holding the blurred result.
    fn create_blur_layer(&mut self, source: LayerKey, sigma_x: f32, sigma_y: f32, parent: LayerKey) -> RenderTargetId {
        let max_sigma = self.config.max_blur_sigma;
        let max_size = self.config.max_texture_size;
        let blur_x = adjust_sigma(sigma_x, max_sigma, max_size);
        let blur_y = adjust_sigma(sigma_y, max_sigma, max_size);

        let source = &self.layers[source];
        let bounds = source.layer_bounds;
        let source_target = source.target;
        let width = texture_extent(source.width as f32 / blur_x.scale_factor as f32);
        let height = texture_extent(source.height as f32 / blur_y.scale_factor as f32);

        let x_target = self.alloc_target();
        let x_layer = RenderLayer::new(x_target, width, height, bounds).without_msaa();
        let x_key = self.add_child(parent, x_layer);

        let y_target = self.alloc_target();
        let y_layer = RenderLayer::new(y_target, width, height, bounds).without_msaa();
        let y_key = self.add_child(parent, y_layer);

        let mesh = Rc::new(image_mesh(None, &Rect::UNIT, &bounds));
        let kernel_x = self.kernels.kernel(blur_x.sigma, blur_x.radius);
        let kernel_y = self.kernels.kernel(blur_y.sigma, blur_y.radius);

        let draw = material::mask_filter(
            &self.layers[x_key],
            mesh.clone(),
            source_target,
            blur_x.radius as f32,
            [1.0 / width as f32, 0.0],
            kernel_x,
        );
        self.layers[x_key].add_draw(draw);

        let draw = material::mask_filter(
            &self.layers[y_key],
            mesh,
            x_target,
            blur_y.radius as f32,
            [0.0, -1.0 / height as f32],
            kernel_y,
        );
        self.layers[y_key].add_draw(draw);

        y_target
    }

    // ─────────────────────────────────────────────────────────────────────
    // Drawing
    // ─────────────────────────────────────────────────────────────────────

    fn draw_path(&mut self, path: &Path, paint: &Paint) {
        let state = self.layer().state();
        let matrix = *state.matrix();
        let scale = state.scale();
        let dpr = self.config.device_pixel_ratio;

        match paint.style {
            PaintingStyle::Fill => {
                let cache = path.flatten(scale * dpr, &mut self.tessellator);
                let fill = cache.fill_mesh(self.fringe_width);
                let draw = MeshDraw::Fill {
                    mesh: Rc::new(fill.mesh.transform(&matrix)),
                    fringe: fill.fringe.map(|fringe| Rc::new(fringe.transform(&matrix))),
                    convex: fill.convex,
                };
                self.draw_mesh(paint, draw);
            }
            PaintingStyle::Stroke => {
                if scale <= 0.0 {
                    tracing::trace!("stroke under degenerate matrix skipped");
                    return;
                }

                let fringe = self.fringe_width;
                let mut stroke_width = (paint.stroke_width * scale).clamp(0.0, self.config.max_stroke_width);
                let mut alpha = 1.0;
                if stroke_width == 0.0 {
                    stroke_width = fringe;
                } else if stroke_width < fringe {
                    // Hairline: fade by covered area instead of thinning further
                    alpha = (stroke_width / fringe).clamp(0.0, 1.0);
                    alpha *= alpha;
                    stroke_width = fringe;
                }

                let half_width = stroke_width / scale * 0.5;
                let stroke_mult = (fringe * 0.5 + half_width * 0.5) / fringe;

                let cache = path.flatten(scale * dpr, &mut self.tessellator);
                let mesh = cache.stroke_mesh(StrokeParams {
                    half_width,
                    cap: paint.stroke_cap,
                    join: paint.stroke_join,
                    miter_limit: paint.stroke_miter_limit,
                });
                let draw = MeshDraw::Stroke {
                    mesh: Rc::new(mesh.transform(&matrix)),
                    alpha,
                    stroke_mult,
                };
                self.draw_mesh(paint, draw);
            }
        }
    }

    fn draw_image(&mut self, image: &Image, offset: Point, paint: &Paint) {
        let dpr = self.config.device_pixel_ratio;
        let dst = Rect::from_ltwh(
            offset.x,
            offset.y,
            image.width() as f32 / dpr,
            image.height() as f32 / dpr,
        );
        self.draw_image_rect(image, None, dst, paint);
    }

    fn draw_image_rect(&mut self, image: &Image, src: Option<Rect>, dst: Rect, paint: &Paint) {
        if !image.is_valid() {
            tracing::trace!("invalid image {:?} skipped", image.id());
            return;
        }

        let (w, h) = (image.width() as f32, image.height() as f32);
        let src = src.map_or(Rect::UNIT, |src| src.scale(1.0 / w, 1.0 / h));

        let mesh = image_mesh(Some(*self.layer().state().matrix()), &src, &dst);
        if !self.apply_clip(mesh.bounds()) {
            tracing::trace!("image {:?} clipped away", image.id());
            return;
        }
        let draw = material::tex(&self.layers[self.current], paint, Rc::new(mesh), image, &mut self.gradients);
        self.push_draw(draw);
    }

    fn draw_image_nine(&mut self, image: &Image, src: Option<Rect>, center: Rect, dst: Rect, paint: &Paint) {
        if !image.is_valid() {
            tracing::trace!("invalid image {:?} skipped", image.id());
            return;
        }

        let (w, h) = (image.width() as f32, image.height() as f32);
        let src = src.map_or(Rect::UNIT, |src| src.scale(1.0 / w, 1.0 / h));
        let center = center.scale(1.0 / w, 1.0 / h);
        let dpr = self.config.device_pixel_ratio;

        let mesh = image_nine_mesh(
            Some(*self.layer().state().matrix()),
            &src,
            &center,
            (w / dpr, h / dpr),
            &dst,
        );
        if !self.apply_clip(mesh.bounds()) {
            tracing::trace!("image {:?} clipped away", image.id());
            return;
        }
        let draw = material::tex(&self.layers[self.current], paint, Rc::new(mesh), image, &mut self.gradients);
        self.push_draw(draw);
    }

    fn draw_text_blob(&mut self, blob: &TextBlob, offset: Point, paint: &Paint) {
        for shadow in blob.shadows() {
            self.draw_glyphs(blob, offset + shadow.offset, &shadow.paint());
        }
        self.draw_glyphs(blob, offset, paint);
    }

    fn draw_glyphs(&mut self, blob: &TextBlob, offset: Point, paint: &Paint) {
        if blob.is_empty() {
            return;
        }

        let mut matrix = *self.layer().state().matrix();
        matrix.pre_translate(offset.x, offset.y);
        let draw = MeshDraw::Text {
            mesh: Rc::new(text_mesh(matrix, blob)),
            bounds: matrix.map_rect(&blob.bounds_in_text()),
            atlas: blob.atlas().clone(),
            color_glyphs: blob.has_color_glyphs(),
        };
        self.draw_mesh(paint, draw);
    }

    fn draw_picture(&mut self, picture: &Picture, needs_save: bool) -> Result<()> {
        if needs_save {
            self.save();
        }

        let mut save_count = 0usize;
        for cmd in picture.draw_cmds() {
            match cmd {
                DrawCmd::Save => {
                    save_count += 1;
                    self.save();
                }
                DrawCmd::SaveLayer { rect, paint } => {
                    save_count += 1;
                    self.save_layer(*rect, paint);
                }
                DrawCmd::Restore => {
                    if save_count == 0 {
                        return Err(RenderError::UnmatchedSaveRestore);
                    }
                    save_count -= 1;
                    self.restore();
                }
                DrawCmd::Translate { dx, dy } => self.update_matrix(|m| m.pre_translate(*dx, *dy)),
                DrawCmd::Scale { sx, sy } => self.update_matrix(|m| m.pre_scale(*sx, *sy)),
                DrawCmd::Rotate { radians, pivot } => {
                    let rotation = Matrix::rotation_about(*radians, pivot.unwrap_or(Point::ZERO));
                    self.update_matrix(|m| m.pre_concat(&rotation));
                }
                DrawCmd::Skew { sx, sy } => self.update_matrix(|m| m.pre_concat(&Matrix::skew(*sx, *sy))),
                DrawCmd::Concat(matrix) => self.update_matrix(|m| m.pre_concat(matrix)),
                DrawCmd::ResetMatrix => self.update_matrix(|m| *m = Matrix::IDENTITY),
                DrawCmd::SetMatrix(matrix) => self.update_matrix(|m| *m = *matrix),
                DrawCmd::ClipRect(rect) => {
                    let mut path = Path::new();
                    path.add_rect(*rect);
                    self.clip_path(&path);
                }
                DrawCmd::ClipRRect(rrect) => {
                    let mut path = Path::new();
                    path.add_rrect(rrect);
                    self.clip_path(&path);
                }
                DrawCmd::ClipPath(path) => self.clip_path(path),
                DrawCmd::DrawPath { path, paint } => self.draw_path(path, paint),
                DrawCmd::DrawImage {
                    image,
                    offset,
                    paint,
                } => self.draw_image(image, *offset, paint),
                DrawCmd::DrawImageRect {
                    image,
                    src,
                    dst,
                    paint,
                } => self.draw_image_rect(image, *src, *dst, paint),
                DrawCmd::DrawImageNine {
                    image,
                    src,
                    center,
                    dst,
                    paint,
                } => self.draw_image_nine(image, *src, *center, *dst, paint),
                DrawCmd::DrawPicture(nested) => self.draw_picture(nested, true)?,
                DrawCmd::DrawTextBlob {
                    blob,
                    offset,
                    paint,
                } => self.draw_text_blob(blob, *offset, paint),
            }
        }

        if save_count != 0 {
            return Err(RenderError::UnmatchedSaveRestore);
        }

        if needs_save {
            self.restore();
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Emission
    // ─────────────────────────────────────────────────────────────────────

    fn set_target(&mut self, target: RenderTargetId, to_clear: &mut bool, buffer: &mut dyn CommandBuffer) {
        if self.last_target == Some(target) {
            return;
        }
        self.last_target = Some(target);
        buffer.submit(Directive::SetTarget(target));

        if *to_clear {
            buffer.submit(Directive::ClearTarget(target));
            *to_clear = false;
        }
    }

    fn emit_layer(&mut self, key: LayerKey, buffer: &mut dyn CommandBuffer) {
        let layer = &mut self.layers[key];
        let target = layer.target;
        let draws = std::mem::take(&mut layer.draws);
        let children = std::mem::take(&mut layer.children);
        let mut to_clear = true;

        for cmd in draws {
            match cmd {
                RenderCmd::Layer(child) => {
                    let child_layer = &self.layers[child];
                    let msaa_samples = if child_layer.no_msaa {
                        0
                    } else {
                        self.config.msaa_samples
                    };
                    buffer.submit(Directive::AllocateTarget {
                        id: child_layer.target,
                        descriptor: TargetDescriptor {
                            width: child_layer.width,
                            height: child_layer.height,
                            filter_mode: child_layer.filter_mode,
                            msaa_samples,
                        },
                    });
                    self.emit_layer(child, buffer);
                }
                RenderCmd::Draw(record) => {
                    self.set_target(target, &mut to_clear, buffer);
                    if record.mesh.is_empty() {
                        tracing::trace!("empty mesh skipped");
                        continue;
                    }

                    let mesh_buffer = self.mesh_pool.checkout(&record.mesh);
                    buffer.submit(Directive::DrawMesh(DrawMesh {
                        material: record.material,
                        pass: record.pass,
                        properties: record.properties,
                        matrix: record.mesh.matrix().copied().unwrap_or(Matrix::IDENTITY),
                        bounds: record.mesh.bounds(),
                        buffer: mesh_buffer,
                    }));
                }
                RenderCmd::Scissor(scissor) => {
                    self.set_target(target, &mut to_clear, buffer);
                    buffer.submit(match scissor {
                        Some(rect) => Directive::EnableScissor(rect),
                        None => Directive::DisableScissor,
                    });
                }
            }
        }

        if to_clear {
            self.set_target(target, &mut to_clear, buffer);
        }

        for child in children {
            buffer.submit(Directive::ReleaseTarget(self.layers[child].target));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_paint::{Canvas, RecordingCanvas};

    fn flusher() -> PictureFlusher {
        PictureFlusher::new(RendererConfig::default(), 100, 100).unwrap()
    }

    fn record(draw: impl FnOnce(&mut RecordingCanvas)) -> Picture {
        let mut canvas = RecordingCanvas::default();
        draw(&mut canvas);
        canvas.end_recording().unwrap()
    }

    fn draws(directives: &[Directive]) -> Vec<&DrawMesh> {
        directives.iter().filter_map(Directive::as_draw_mesh).collect()
    }

    #[test]
    fn test_empty_picture_clears_surface() {
        let mut flusher = flusher();
        let mut out = Vec::new();
        flusher.flush(&record(|_| {}), &mut out).unwrap();

        assert!(matches!(out[0], Directive::SetTarget(RenderTargetId::SURFACE)));
        assert!(matches!(out[1], Directive::ClearTarget(RenderTargetId::SURFACE)));
        assert!(matches!(out[2], Directive::DisableScissor));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_concave_fill_uses_stencil() {
        let mut flusher = flusher();
        let picture = record(|canvas| {
            let mut path = Path::new();
            path.move_to(0.0, 0.0);
            path.line_to(50.0, 0.0);
            path.line_to(25.0, 10.0);
            path.line_to(50.0, 50.0);
            path.line_to(0.0, 50.0);
            path.close();
            canvas.draw_path(&path, &Paint::fill(Color::BLUE));
        });
        let mut out = Vec::new();
        flusher.flush(&picture, &mut out).unwrap();

        let kinds: Vec<_> = draws(&out).iter().map(|d| d.material.kind).collect();
        assert_eq!(
            kinds,
            vec![
                crate::material::MaterialKind::Fill0,
                crate::material::MaterialKind::Fill1,
                crate::material::MaterialKind::StrokeAlpha,
                crate::material::MaterialKind::Stroke1,
            ]
        );
    }

    #[test]
    fn test_hairline_stroke_fades() {
        let mut flusher = PictureFlusher::new(RendererConfig::default().with_device_pixel_ratio(2.0), 100, 100).unwrap();
        let picture = record(|canvas| {
            canvas.draw_line(Point::new(0.0, 10.0), Point::new(40.0, 10.0), &Paint::stroke(Color::BLACK, 0.25));
        });
        let mut out = Vec::new();
        flusher.flush(&picture, &mut out).unwrap();

        let stroke = draws(&out)[0];
        // 0.25 against a 0.5 fringe covers a quarter of the area
        assert!((stroke.properties.alpha - 0.25).abs() < 1e-6);
        assert!((stroke.properties.stroke_mult - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_caches_survive_flushes() {
        let mut flusher = flusher();
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.cubic_to(10.0, 40.0, 30.0, 40.0, 40.0, 0.0);
        path.close();
        let picture = record(|canvas| canvas.draw_path(&path, &Paint::fill(Color::RED)));

        flusher.flush(&picture, &mut Vec::new()).unwrap();
        let cached = flusher.tessellator().len();
        assert!(cached > 0);
        flusher.flush(&picture, &mut Vec::new()).unwrap();
        assert_eq!(flusher.tessellator().len(), cached);
    }

    #[test]
    fn test_clipped_away_draw_is_skipped() {
        let mut flusher = flusher();
        let picture = record(|canvas| {
            canvas.clip_rect(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
            canvas.draw_rect(Rect::from_ltrb(50.0, 50.0, 60.0, 60.0), &Paint::fill(Color::RED));
        });
        let mut out = Vec::new();
        flusher.flush(&picture, &mut out).unwrap();
        assert!(draws(&out).is_empty());
    }
}
