//! Materials and paint resolution
//!
//! A draw is described by a [`Material`] (which program, blend state and
//! stencil test), a shader pass selecting how the paint is evaluated, and a
//! [`PropertyBlock`] with the per-draw uniforms. The constructors at the end of
//! this file build one [`DrawRecord`] per GPU draw the flusher needs.

use std::rc::Rc;

use verso_core::{Color, Matrix};
use verso_paint::{
    BlendMode, ColorFilter, FilterMode, Image, ImageId, Mesh, Paint, Shader, TileMode,
};

use crate::command::RenderTargetId;
use crate::gradient_cache::{GradientCache, GradientTexture};
use crate::layer::{DrawRecord, LayerState, RenderLayer};

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Premultiplied-alpha blend equation `src * src_factor + dst * dst_factor`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl BlendState {
    pub const SRC_OVER: BlendState = BlendState::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

    pub const fn new(src_factor: BlendFactor, dst_factor: BlendFactor) -> Self {
        Self {
            src_factor,
            dst_factor,
        }
    }

    /// Blend factors for a Porter-Duff mode
    ///
    /// Separable and non-separable modes have no fixed-function equivalent
    /// and are drawn as src-over.
    pub fn for_mode(mode: BlendMode) -> Self {
        use BlendFactor::*;
        match mode {
            BlendMode::SrcOver => Self::SRC_OVER,
            BlendMode::SrcIn => Self::new(DstAlpha, Zero),
            BlendMode::SrcOut => Self::new(OneMinusDstAlpha, Zero),
            BlendMode::SrcATop => Self::new(DstAlpha, OneMinusSrcAlpha),
            BlendMode::DstOver => Self::new(OneMinusDstAlpha, One),
            BlendMode::DstIn => Self::new(Zero, SrcAlpha),
            BlendMode::DstOut => Self::new(Zero, OneMinusSrcAlpha),
            BlendMode::DstATop => Self::new(OneMinusDstAlpha, SrcAlpha),
            BlendMode::Plus => Self::new(One, One),
            BlendMode::Src => Self::new(One, Zero),
            BlendMode::Dst => Self::new(Zero, One),
            BlendMode::Xor => Self::new(OneMinusDstAlpha, OneMinusSrcAlpha),
            BlendMode::Clear => Self::new(Zero, Zero),
            unsupported => {
                tracing::warn!("blend mode {:?} is not supported, drawing as src-over", unsupported);
                Self::SRC_OVER
            }
        }
    }
}

/// Stencil comparison used to honor the clip mask
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilTest {
    /// No mask is active
    Always,
    /// Pass only where the clip mask was written
    Equal,
}

impl StencilTest {
    fn for_layer(layer: &RenderLayer) -> Self {
        if layer.ignore_clip {
            StencilTest::Always
        } else {
            StencilTest::Equal
        }
    }
}

/// Shader program family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Single-pass fill of a convex mesh
    ConvexFill,
    /// Accumulate fill winding into the stencil buffer
    Fill0,
    /// Cover pass where the stencil winding is non-zero
    Fill1,
    /// Anti-aliased stroke, also used for fill fringes
    StrokeAlpha,
    /// Reset the stencil under a stroke
    Stroke1,
    /// Textured quad or glyph run
    Tex,
    /// Clip mask passes, see [`StencilPass`]
    Stencil,
    /// One direction of a separable blur
    Filter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Material {
    pub kind: MaterialKind,
    /// `None` for passes that do not write color
    pub blend: Option<BlendState>,
    /// `None` for passes that ignore the clip mask
    pub clip_test: Option<StencilTest>,
}

impl Material {
    fn blended_clipped(kind: MaterialKind, paint: &Paint, layer: &RenderLayer) -> Self {
        Self {
            kind,
            blend: Some(BlendState::for_mode(paint.blend_mode)),
            clip_test: Some(StencilTest::for_layer(layer)),
        }
    }

    const fn plain(kind: MaterialKind) -> Self {
        Self {
            kind,
            blend: None,
            clip_test: None,
        }
    }
}

/// How the paint is evaluated per fragment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderPass {
    Solid = 0,
    Linear = 1,
    Radial = 2,
    Sweep = 3,
    Image = 4,
}

impl ShaderPass {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Passes of [`MaterialKind::Stencil`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilPass {
    Clear = 0,
    /// Increment the stencil inside one mask shape
    Winding = 1,
    /// Keep only pixels covered by every mask shape
    Cover = 2,
}

impl StencilPass {
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Interpretation of the sampled texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TexMode {
    /// Straight alpha, multiplied by the shader
    PostAlpha = 0,
    /// Already premultiplied (render targets, dynamic images)
    PreAlpha = 1,
    /// Only the alpha channel is used, as coverage
    AlphaOnly = 2,
}

/// Texture bound to a draw
#[derive(Clone, Debug)]
pub enum TextureBinding {
    Image(Image),
    Target(RenderTargetId),
    Gradient(Rc<GradientTexture>),
}

impl TextureBinding {
    pub fn image_id(&self) -> Option<ImageId> {
        match self {
            TextureBinding::Image(image) => Some(image.id()),
            TextureBinding::Gradient(texture) => Some(texture.image.id()),
            TextureBinding::Target(_) => None,
        }
    }

    pub fn target(&self) -> Option<RenderTargetId> {
        match self {
            TextureBinding::Target(id) => Some(*id),
            _ => None,
        }
    }
}

/// Uniforms of a gradient or image shader
#[derive(Clone, Debug)]
pub struct ShaderProperties {
    /// Mesh-local space to shader unit space
    pub matrix: Matrix,
    pub texture: TextureBinding,
    pub left_color: Option<Color>,
    pub right_color: Option<Color>,
    pub tile_mode: TileMode,
    /// Sweep `(bias, scale)`
    pub sweep: Option<(f32, f32)>,
}

#[derive(Clone, Debug)]
pub struct BlurProperties {
    pub radius: f32,
    /// Texel step along the blur direction
    pub img_inc: [f32; 2],
    pub kernel: Rc<[f32]>,
}

/// Per-draw uniforms
#[derive(Clone, Debug)]
pub struct PropertyBlock {
    /// `[left, top, width, height]` of the target layer
    pub viewport: [f32; 4],
    pub alpha: f32,
    pub stroke_mult: f32,
    /// Solid color, set for [`ShaderPass::Solid`]
    pub color: Option<Color>,
    pub shader: Option<ShaderProperties>,
    pub texture: Option<TextureBinding>,
    pub tex_mode: Option<TexMode>,
    pub filter_mode: FilterMode,
    pub blur: Option<BlurProperties>,
    pub color_filter: Option<ColorFilter>,
    pub invert_colors: bool,
}

impl PropertyBlock {
    pub fn with_viewport(viewport: [f32; 4]) -> Self {
        Self {
            viewport,
            alpha: 1.0,
            stroke_mult: 0.0,
            color: None,
            shader: None,
            texture: None,
            tex_mode: None,
            filter_mode: FilterMode::Bilinear,
            blur: None,
            color_filter: None,
            invert_colors: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paint resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Base of the shader matrix: maps mesh-local positions back to canvas space
fn shader_matrix_base(state: &LayerState, mesh_matrix: Option<&Matrix>) -> Matrix {
    if Some(state.matrix()) == mesh_matrix {
        return Matrix::IDENTITY;
    }
    match mesh_matrix {
        None => state.inverse(),
        Some(mesh_matrix) => state.inverse().then(mesh_matrix),
    }
}

/// Shader pass and uniforms for drawing `paint` into `layer`
pub fn resolve_paint(
    layer: &RenderLayer,
    paint: &Paint,
    mesh_matrix: Option<&Matrix>,
    alpha: f32,
    stroke_mult: f32,
    gradients: &mut GradientCache,
) -> (ShaderPass, PropertyBlock) {
    let mut props = PropertyBlock::with_viewport(layer.viewport());
    props.alpha = alpha;
    props.stroke_mult = stroke_mult;
    props.color_filter = paint.color_filter;
    props.invert_colors = paint.invert_colors;

    let Some(shader) = &paint.shader else {
        props.color = Some(paint.color);
        return (ShaderPass::Solid, props);
    };

    let base = shader_matrix_base(layer.state(), mesh_matrix);
    let pass = match shader {
        Shader::Gradient(gradient) => {
            let pass = match gradient.sweep_bias_scale() {
                Some(_) => ShaderPass::Sweep,
                None if matches!(gradient.kind(), verso_paint::GradientKind::Linear { .. }) => {
                    ShaderPass::Linear
                }
                None => ShaderPass::Radial,
            };
            props.shader = Some(ShaderProperties {
                matrix: gradient.gradient_matrix(base),
                texture: TextureBinding::Gradient(gradients.get(gradient)),
                left_color: Some(gradient.left_color()),
                right_color: Some(gradient.right_color()),
                tile_mode: gradient.tile_mode(),
                sweep: gradient.sweep_bias_scale(),
            });
            pass
        }
        Shader::Image(image) => {
            props.shader = Some(ShaderProperties {
                matrix: image.shader_matrix(base),
                texture: TextureBinding::Image(image.image.clone()),
                left_color: None,
                right_color: None,
                tile_mode: image.tile_mode,
                sweep: None,
            });
            ShaderPass::Image
        }
    };
    (pass, props)
}

// ─────────────────────────────────────────────────────────────────────────────
// Draw records
// ─────────────────────────────────────────────────────────────────────────────

fn record(material: Material, pass: u32, properties: PropertyBlock, mesh: Rc<Mesh>) -> DrawRecord {
    DrawRecord {
        material,
        pass,
        properties,
        mesh,
    }
}

fn shaded(
    kind: MaterialKind,
    layer: &RenderLayer,
    paint: &Paint,
    mesh: Rc<Mesh>,
    alpha: f32,
    stroke_mult: f32,
    gradients: &mut GradientCache,
) -> DrawRecord {
    let material = Material::blended_clipped(kind, paint, layer);
    let (pass, props) = resolve_paint(layer, paint, mesh.matrix(), alpha, stroke_mult, gradients);
    record(material, pass.index(), props, mesh)
}

fn viewport_only(material: Material, pass: u32, layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    record(material, pass, PropertyBlock::with_viewport(layer.viewport()), mesh)
}

pub(crate) fn convex_fill(
    layer: &RenderLayer,
    paint: &Paint,
    mesh: Rc<Mesh>,
    gradients: &mut GradientCache,
) -> DrawRecord {
    shaded(MaterialKind::ConvexFill, layer, paint, mesh, 1.0, 0.0, gradients)
}

pub(crate) fn fill0(layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    let material = Material {
        kind: MaterialKind::Fill0,
        blend: None,
        clip_test: Some(StencilTest::for_layer(layer)),
    };
    viewport_only(material, 0, layer, mesh)
}

/// Cover the stencilled fill with its bounding quad
pub(crate) fn fill1(
    layer: &RenderLayer,
    paint: &Paint,
    mesh: &Mesh,
    gradients: &mut GradientCache,
) -> DrawRecord {
    let material = Material {
        kind: MaterialKind::Fill1,
        blend: Some(BlendState::for_mode(paint.blend_mode)),
        clip_test: None,
    };
    let (pass, props) = resolve_paint(layer, paint, mesh.matrix(), 1.0, 0.0, gradients);
    record(material, pass.index(), props, mesh.bounds_mesh())
}

pub(crate) fn stroke_alpha(
    layer: &RenderLayer,
    paint: &Paint,
    alpha: f32,
    stroke_mult: f32,
    mesh: Rc<Mesh>,
    gradients: &mut GradientCache,
) -> DrawRecord {
    shaded(MaterialKind::StrokeAlpha, layer, paint, mesh, alpha, stroke_mult, gradients)
}

pub(crate) fn stroke1(layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    viewport_only(Material::plain(MaterialKind::Stroke1), 0, layer, mesh)
}

pub(crate) fn stencil_clear(layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    viewport_only(Material::plain(MaterialKind::Stencil), StencilPass::Clear.index(), layer, mesh)
}

pub(crate) fn stencil0(layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    viewport_only(Material::plain(MaterialKind::Stencil), StencilPass::Winding.index(), layer, mesh)
}

pub(crate) fn stencil1(layer: &RenderLayer, mesh: Rc<Mesh>) -> DrawRecord {
    viewport_only(Material::plain(MaterialKind::Stencil), StencilPass::Cover.index(), layer, mesh)
}

/// Textured draw sampling an uploaded image
pub(crate) fn tex(
    layer: &RenderLayer,
    paint: &Paint,
    mesh: Rc<Mesh>,
    image: &Image,
    gradients: &mut GradientCache,
) -> DrawRecord {
    let mut draw = shaded(MaterialKind::Tex, layer, paint, mesh, 1.0, 0.0, gradients);
    draw.properties.filter_mode = paint.filter_mode;
    draw.properties.texture = Some(TextureBinding::Image(image.clone()));
    draw.properties.tex_mode = Some(if image.is_dynamic() {
        TexMode::PreAlpha
    } else {
        TexMode::PostAlpha
    });
    draw
}

/// Textured draw sampling another layer's render target
pub(crate) fn tex_rt(
    layer: &RenderLayer,
    paint: &Paint,
    mesh: Rc<Mesh>,
    source: RenderTargetId,
    gradients: &mut GradientCache,
) -> DrawRecord {
    let mut draw = shaded(MaterialKind::Tex, layer, paint, mesh, 1.0, 0.0, gradients);
    draw.properties.texture = Some(TextureBinding::Target(source));
    draw.properties.tex_mode = Some(TexMode::PreAlpha);
    draw
}

/// Glyph or mask coverage tinted by the paint
pub(crate) fn tex_alpha(
    layer: &RenderLayer,
    paint: &Paint,
    mesh: Rc<Mesh>,
    atlas: &Image,
    gradients: &mut GradientCache,
) -> DrawRecord {
    let mut draw = shaded(MaterialKind::Tex, layer, paint, mesh, 1.0, 0.0, gradients);
    draw.properties.filter_mode = paint.filter_mode;
    draw.properties.texture = Some(TextureBinding::Image(atlas.clone()));
    draw.properties.tex_mode = Some(TexMode::AlphaOnly);
    draw
}

/// One blur direction reading from `source`
pub(crate) fn mask_filter(
    layer: &RenderLayer,
    mesh: Rc<Mesh>,
    source: RenderTargetId,
    radius: f32,
    img_inc: [f32; 2],
    kernel: Rc<[f32]>,
) -> DrawRecord {
    let mut draw = viewport_only(Material::plain(MaterialKind::Filter), 0, layer, mesh);
    draw.properties.texture = Some(TextureBinding::Target(source));
    draw.properties.blur = Some(BlurProperties {
        radius,
        img_inc,
        kernel,
    });
    draw
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_core::{Point, Rect};
    use verso_paint::{Gradient, ImageShader};

    fn layer() -> RenderLayer {
        RenderLayer::new(RenderTargetId::SURFACE, 100, 100, Rect::from_ltrb(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn test_blend_factors() {
        assert_eq!(
            BlendState::for_mode(BlendMode::SrcOver),
            BlendState::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha)
        );
        assert_eq!(
            BlendState::for_mode(BlendMode::DstIn),
            BlendState::new(BlendFactor::Zero, BlendFactor::SrcAlpha)
        );
        assert_eq!(
            BlendState::for_mode(BlendMode::Plus),
            BlendState::new(BlendFactor::One, BlendFactor::One)
        );
        assert_eq!(BlendState::for_mode(BlendMode::Multiply), BlendState::SRC_OVER);
    }

    #[test]
    fn test_solid_paint_resolves_color() {
        let mut gradients = GradientCache::new(4, 16);
        let (pass, props) = resolve_paint(&layer(), &Paint::fill(Color::RED), None, 0.5, 2.0, &mut gradients);

        assert_eq!(pass, ShaderPass::Solid);
        assert_eq!(props.color, Some(Color::RED));
        assert_eq!(props.alpha, 0.5);
        assert_eq!(props.stroke_mult, 2.0);
        assert_eq!(props.viewport, [0.0, 0.0, 100.0, 100.0]);
        assert!(props.shader.is_none());
    }

    #[test]
    fn test_gradient_passes() {
        let mut gradients = GradientCache::new(4, 16);
        let colors = vec![Color::RED, Color::BLUE];
        let linear = Gradient::linear(Point::ZERO, Point::new(10.0, 0.0), colors.clone(), None, TileMode::Clamp, None).unwrap();
        let radial = Gradient::radial(Point::ZERO, 10.0, colors.clone(), None, TileMode::Mirror, None).unwrap();
        let sweep =
            Gradient::sweep(Point::ZERO, colors, None, TileMode::Clamp, 0.0, std::f32::consts::PI, None).unwrap();

        let layer = layer();
        let resolve = |gradient: Gradient, gradients: &mut GradientCache| {
            let paint = Paint::fill(Color::WHITE).with_shader(gradient.into());
            resolve_paint(&layer, &paint, None, 1.0, 0.0, gradients)
        };

        let (pass, props) = resolve(linear, &mut gradients);
        assert_eq!(pass, ShaderPass::Linear);
        let shader = props.shader.unwrap();
        assert!(matches!(shader.texture, TextureBinding::Gradient(_)));
        assert_eq!(shader.left_color, Some(Color::RED));
        assert_eq!(shader.right_color, Some(Color::BLUE));
        // Unit space: x = 10 maps to 1
        let p = shader.matrix.transform_point(Point::new(10.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-5);

        assert_eq!(resolve(radial, &mut gradients).0, ShaderPass::Radial);

        let (pass, props) = resolve(sweep, &mut gradients);
        assert_eq!(pass, ShaderPass::Sweep);
        let (bias, scale) = props.shader.unwrap().sweep.unwrap();
        assert_eq!(bias, 0.0);
        assert!((scale - 2.0).abs() < 1e-5);

        // All three share one ramp
        assert_eq!(gradients.len(), 1);
    }

    #[test]
    fn test_shader_base_uses_inverse_canvas_matrix() {
        let mut layer = layer();
        layer.state_mut().set_matrix(Matrix::translation(10.0, 0.0));
        let image = Image::new(20, 20);
        let paint = Paint::fill(Color::WHITE)
            .with_shader(ImageShader::new(image, TileMode::Repeated, None).into());
        let mut gradients = GradientCache::new(4, 16);

        // Mesh placed under the canvas matrix: shader space is mesh space
        let same = Matrix::translation(10.0, 0.0);
        let (pass, props) = resolve_paint(&layer, &paint, Some(&same), 1.0, 0.0, &mut gradients);
        assert_eq!(pass, ShaderPass::Image);
        assert_eq!(props.shader.unwrap().matrix, Matrix::scale(1.0 / 20.0, 1.0 / 20.0));

        // World-space mesh: undo the canvas translation first
        let (_, props) = resolve_paint(&layer, &paint, None, 1.0, 0.0, &mut gradients);
        let p = props.shader.unwrap().matrix.transform_point(Point::new(30.0, 20.0));
        assert!((p.x - 1.0).abs() < 1e-5 && (p.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_clip_test_follows_layer() {
        let mut layer = layer();
        let mesh = Rc::new(Mesh::from_rect(&Rect::UNIT));
        let mut gradients = GradientCache::new(4, 16);

        let draw = convex_fill(&layer, &Paint::default(), mesh.clone(), &mut gradients);
        assert_eq!(draw.material.clip_test, Some(StencilTest::Always));

        layer.ignore_clip = false;
        let draw = convex_fill(&layer, &Paint::default(), mesh.clone(), &mut gradients);
        assert_eq!(draw.material.clip_test, Some(StencilTest::Equal));

        let draw = stencil0(&layer, mesh);
        assert_eq!(draw.material.kind, MaterialKind::Stencil);
        assert_eq!(draw.pass, StencilPass::Winding.index());
        assert_eq!(draw.material.clip_test, None);
    }

    #[test]
    fn test_texture_modes() {
        let layer = layer();
        let mesh = Rc::new(Mesh::from_rect(&Rect::UNIT));
        let mut gradients = GradientCache::new(4, 16);
        let paint = Paint::default();

        let draw = tex(&layer, &paint, mesh.clone(), &Image::new(4, 4), &mut gradients);
        assert_eq!(draw.properties.tex_mode, Some(TexMode::PostAlpha));
        let draw = tex(&layer, &paint, mesh.clone(), &Image::dynamic(4, 4), &mut gradients);
        assert_eq!(draw.properties.tex_mode, Some(TexMode::PreAlpha));

        let draw = tex_rt(&layer, &paint, mesh.clone(), RenderTargetId(7), &mut gradients);
        assert_eq!(draw.properties.texture.and_then(|t| t.target()), Some(RenderTargetId(7)));

        let draw = tex_alpha(&layer, &paint, mesh, &Image::new(4, 4), &mut gradients);
        assert_eq!(draw.properties.tex_mode, Some(TexMode::AlphaOnly));
    }
}
