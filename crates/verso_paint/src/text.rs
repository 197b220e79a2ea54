//! Pre-shaped text runs
//!
//! Shaping and glyph rasterization are done by the text engine. What reaches
//! the renderer is a [`TextBlob`]: one quad per glyph in text space with the
//! matching UV rect in a glyph atlas, plus the run's shadows.

use std::rc::Rc;

use verso_core::{Color, Point, Rect};

use crate::image::Image;
use crate::paint::{BlurStyle, MaskFilter, Paint};

/// One positioned glyph
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    /// Glyph rect in text space
    pub rect: Rect,
    /// Source rect in the atlas, normalized to `[0, 1]`
    pub uv: Rect,
}

/// Shadow painted underneath a text run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextShadow {
    pub color: Color,
    pub offset: Point,
    /// Used directly as the blur sigma
    pub blur_radius: f32,
}

impl TextShadow {
    /// Paint used to render this shadow
    pub fn paint(&self) -> Paint {
        let mut paint = Paint::fill(self.color);
        if self.blur_radius != 0.0 {
            paint.mask_filter = Some(MaskFilter::blur(BlurStyle::Normal, self.blur_radius));
        }
        paint
    }
}

#[derive(Debug)]
struct TextBlobInner {
    glyphs: Vec<GlyphQuad>,
    atlas: Image,
    color_glyphs: bool,
    bounds: Rect,
    shadows: Vec<TextShadow>,
}

/// Immutable, shareable glyph run
#[derive(Clone, Debug)]
pub struct TextBlob {
    inner: Rc<TextBlobInner>,
}

impl PartialEq for TextBlob {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl TextBlob {
    /// Glyph run sampling a single-channel coverage atlas
    pub fn new(atlas: Image, glyphs: Vec<GlyphQuad>) -> Self {
        Self::build(atlas, glyphs, false, Vec::new())
    }

    /// Glyph run sampling a full-color atlas (emoji)
    pub fn with_color_glyphs(atlas: Image, glyphs: Vec<GlyphQuad>) -> Self {
        Self::build(atlas, glyphs, true, Vec::new())
    }

    /// Same glyphs with `shadows` attached
    pub fn with_shadows(&self, shadows: Vec<TextShadow>) -> Self {
        Self::build(
            self.inner.atlas.clone(),
            self.inner.glyphs.clone(),
            self.inner.color_glyphs,
            shadows,
        )
    }

    fn build(atlas: Image, glyphs: Vec<GlyphQuad>, color_glyphs: bool, shadows: Vec<TextShadow>) -> Self {
        let bounds = glyphs
            .iter()
            .map(|g| g.rect)
            .reduce(|acc, r| acc.expand_to_include(&r))
            .unwrap_or(Rect::ZERO);
        Self {
            inner: Rc::new(TextBlobInner {
                glyphs,
                atlas,
                color_glyphs,
                bounds,
                shadows,
            }),
        }
    }

    pub fn glyphs(&self) -> &[GlyphQuad] {
        &self.inner.glyphs
    }

    pub fn atlas(&self) -> &Image {
        &self.inner.atlas
    }

    /// Whether the atlas holds colored glyphs rather than coverage
    pub fn has_color_glyphs(&self) -> bool {
        self.inner.color_glyphs
    }

    pub fn shadows(&self) -> &[TextShadow] {
        &self.inner.shadows
    }

    pub fn is_empty(&self) -> bool {
        self.inner.glyphs.is_empty()
    }

    /// Union of all glyph rects in text space
    pub fn bounds_in_text(&self) -> Rect {
        self.inner.bounds
    }

    pub fn shifted_bounds(&self, offset: Point) -> Rect {
        self.inner.bounds.shift(offset)
    }
}
