//! Paint descriptions
//!
//! A [`Paint`] is a plain value describing how a shape is filled or stroked.
//! It is cloned into every recorded draw command; shaders are shared through
//! `Rc` so the clone stays cheap.

use verso_core::{Color, Matrix};

use crate::shader::Shader;

/// Fill the interior or stroke the outline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintingStyle {
    #[default]
    Fill,
    Stroke,
}

/// Decoration at the ends of open stroked subpaths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Decoration at the corners of stroked subpaths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Porter-Duff and separable blend modes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcATop,
    DstATop,
    Xor,
    Plus,
    Modulate,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Texture sampling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlurStyle {
    #[default]
    Normal,
    Solid,
    Outer,
    Inner,
}

/// Blur applied to the coverage of a shape before it is composited
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskFilter {
    pub style: BlurStyle,
    pub sigma: f32,
}

impl MaskFilter {
    pub const fn blur(style: BlurStyle, sigma: f32) -> Self {
        Self { style, sigma }
    }
}

/// Blends a constant color over every painted pixel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorFilter {
    pub color: Color,
    pub blend_mode: BlendMode,
}

impl ColorFilter {
    pub const fn mode(color: Color, blend_mode: BlendMode) -> Self {
        Self { color, blend_mode }
    }
}

/// Filter applied to the backdrop of a layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFilter {
    Blur { sigma_x: f32, sigma_y: f32 },
    Matrix { matrix: Matrix, filter_mode: FilterMode },
}

impl ImageFilter {
    pub const fn blur(sigma_x: f32, sigma_y: f32) -> Self {
        ImageFilter::Blur { sigma_x, sigma_y }
    }

    pub const fn matrix(matrix: Matrix, filter_mode: FilterMode) -> Self {
        ImageFilter::Matrix {
            matrix,
            filter_mode,
        }
    }
}

/// How to paint a shape
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub blend_mode: BlendMode,
    pub style: PaintingStyle,
    pub stroke_width: f32,
    pub stroke_cap: StrokeCap,
    pub stroke_join: StrokeJoin,
    pub stroke_miter_limit: f32,
    pub filter_mode: FilterMode,
    pub color_filter: Option<ColorFilter>,
    pub mask_filter: Option<MaskFilter>,
    pub backdrop: Option<ImageFilter>,
    pub shader: Option<Shader>,
    pub invert_colors: bool,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            blend_mode: BlendMode::SrcOver,
            style: PaintingStyle::Fill,
            stroke_width: 0.0,
            stroke_cap: StrokeCap::Butt,
            stroke_join: StrokeJoin::Miter,
            stroke_miter_limit: 4.0,
            filter_mode: FilterMode::Bilinear,
            color_filter: None,
            mask_filter: None,
            backdrop: None,
            shader: None,
            invert_colors: false,
        }
    }
}

impl Paint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solid fill with `color`
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Solid stroke with `color` and `width`
    pub fn stroke(color: Color, width: f32) -> Self {
        Self {
            color,
            style: PaintingStyle::Stroke,
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_shader(mut self, shader: Shader) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn with_mask_filter(mut self, mask_filter: MaskFilter) -> Self {
        self.mask_filter = Some(mask_filter);
        self
    }

    pub fn with_backdrop(mut self, backdrop: ImageFilter) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    pub fn with_stroke_cap(mut self, cap: StrokeCap) -> Self {
        self.stroke_cap = cap;
        self
    }

    pub fn with_stroke_join(mut self, join: StrokeJoin) -> Self {
        self.stroke_join = join;
        self
    }

    /// Geometry-only copy: keeps the stroke settings, drops color and effects
    ///
    /// Used when the shape is rendered as a coverage mask.
    pub fn shape_only(&self) -> Paint {
        Paint {
            style: self.style,
            stroke_width: self.stroke_width,
            stroke_cap: self.stroke_cap,
            stroke_join: self.stroke_join,
            stroke_miter_limit: self.stroke_miter_limit,
            ..Paint::default()
        }
    }

    /// Mask blur sigma, `None` when there is no effective blur
    pub fn blur_sigma(&self) -> Option<f32> {
        self.mask_filter
            .map(|filter| filter.sigma)
            .filter(|sigma| *sigma != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paint() {
        let paint = Paint::default();
        assert_eq!(paint.color, Color::WHITE);
        assert_eq!(paint.style, PaintingStyle::Fill);
        assert_eq!(paint.blend_mode, BlendMode::SrcOver);
        assert_eq!(paint.stroke_miter_limit, 4.0);
        assert_eq!(paint.filter_mode, FilterMode::Bilinear);
    }

    #[test]
    fn test_shape_only_drops_effects() {
        let paint = Paint::stroke(Color::RED, 3.0)
            .with_stroke_cap(StrokeCap::Round)
            .with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 2.0))
            .with_blend_mode(BlendMode::Multiply);

        let shape = paint.shape_only();
        assert_eq!(shape.style, PaintingStyle::Stroke);
        assert_eq!(shape.stroke_width, 3.0);
        assert_eq!(shape.stroke_cap, StrokeCap::Round);
        assert_eq!(shape.color, Color::WHITE);
        assert_eq!(shape.mask_filter, None);
        assert_eq!(shape.blend_mode, BlendMode::SrcOver);
    }

    #[test]
    fn test_zero_sigma_is_not_a_blur() {
        let paint = Paint::fill(Color::BLACK).with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 0.0));
        assert_eq!(paint.blur_sigma(), None);

        let paint = paint.with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 1.5));
        assert_eq!(paint.blur_sigma(), Some(1.5));
    }
}
