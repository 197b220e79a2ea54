//! Recorded drawing operations
//!
//! [`DrawCmd`] is the closed set of opcodes a [`Picture`](crate::Picture)
//! holds. State updates (save, transforms, clips) carry no bounds; drawing
//! commands report a conservative rect in their local coordinate space.

use std::f32::consts::SQRT_2;

use verso_core::{Matrix, Point, RRect, Rect};

use crate::image::Image;
use crate::paint::{Paint, PaintingStyle, StrokeCap, StrokeJoin};
use crate::path::Path;
use crate::picture::Picture;
use crate::text::TextBlob;

/// A single recorded canvas operation
#[derive(Debug)]
pub enum DrawCmd {
    // State updates
    Save,
    SaveLayer {
        rect: Rect,
        paint: Paint,
    },
    Restore,
    Translate {
        dx: f32,
        dy: f32,
    },
    Scale {
        sx: f32,
        sy: f32,
    },
    Rotate {
        radians: f32,
        pivot: Option<Point>,
    },
    Skew {
        sx: f32,
        sy: f32,
    },
    Concat(Matrix),
    ResetMatrix,
    SetMatrix(Matrix),
    ClipRect(Rect),
    ClipRRect(RRect),
    ClipPath(Path),

    // Drawing
    DrawPath {
        path: Path,
        paint: Paint,
    },
    DrawImage {
        image: Image,
        offset: Point,
        paint: Paint,
    },
    DrawImageRect {
        image: Image,
        src: Option<Rect>,
        dst: Rect,
        paint: Paint,
    },
    DrawImageNine {
        image: Image,
        src: Option<Rect>,
        center: Rect,
        dst: Rect,
        paint: Paint,
    },
    DrawPicture(Picture),
    DrawTextBlob {
        blob: TextBlob,
        offset: Point,
        paint: Paint,
    },
}

impl DrawCmd {
    /// Whether this command only changes canvas state
    pub fn is_state_update(&self) -> bool {
        matches!(
            self,
            DrawCmd::Save
                | DrawCmd::SaveLayer { .. }
                | DrawCmd::Restore
                | DrawCmd::Translate { .. }
                | DrawCmd::Scale { .. }
                | DrawCmd::Rotate { .. }
                | DrawCmd::Skew { .. }
                | DrawCmd::Concat(_)
                | DrawCmd::ResetMatrix
                | DrawCmd::SetMatrix(_)
                | DrawCmd::ClipRect(_)
                | DrawCmd::ClipRRect(_)
                | DrawCmd::ClipPath(_)
        )
    }

    /// Whether the painted result may change between frames
    pub fn is_dynamic(&self) -> bool {
        let paint_dynamic = |paint: &Paint| paint.shader.as_ref().is_some_and(|s| s.is_dynamic());
        match self {
            DrawCmd::DrawImage { image, paint, .. }
            | DrawCmd::DrawImageRect { image, paint, .. }
            | DrawCmd::DrawImageNine { image, paint, .. } => image.is_dynamic() || paint_dynamic(paint),
            DrawCmd::DrawPicture(picture) => picture.is_dynamic(),
            DrawCmd::DrawPath { paint, .. }
            | DrawCmd::DrawTextBlob { paint, .. }
            | DrawCmd::SaveLayer { paint, .. } => paint_dynamic(paint),
            _ => false,
        }
    }

    /// Conservative local-space bounds of what this command paints
    ///
    /// Returns `None` for state updates.
    pub fn bounds(&self) -> Option<Rect> {
        let rect = match self {
            DrawCmd::DrawPath { path, paint } => {
                let mut rect = path.bounds();
                if paint.style == PaintingStyle::Stroke {
                    rect = rect.inflate(stroke_outset(paint));
                }
                rect
            }
            DrawCmd::DrawImage { image, offset, .. } => Rect::from_ltwh(
                offset.x,
                offset.y,
                image.width() as f32,
                image.height() as f32,
            ),
            DrawCmd::DrawImageRect { dst, .. } | DrawCmd::DrawImageNine { dst, .. } => *dst,
            DrawCmd::DrawPicture(picture) => return Some(picture.paint_bounds()),
            DrawCmd::DrawTextBlob {
                blob,
                offset,
                paint,
            } => {
                let rect = blob.shifted_bounds(*offset);
                return Some(
                    blob.shadows()
                        .iter()
                        .map(|shadow| {
                            rect.shift(shadow.offset)
                                .inflate(3.0 * shadow.blur_radius.abs())
                        })
                        .fold(blur_outset(rect, paint), |acc, r| acc.expand_to_include(&r)),
                );
            }
            _ => return None,
        };

        let paint = match self {
            DrawCmd::DrawPath { paint, .. }
            | DrawCmd::DrawImage { paint, .. }
            | DrawCmd::DrawImageRect { paint, .. }
            | DrawCmd::DrawImageNine { paint, .. } => paint,
            _ => return Some(rect),
        };
        Some(blur_outset(rect, paint))
    }
}

/// Distance a stroke may extend past the path's control-point bounds
fn stroke_outset(paint: &Paint) -> f32 {
    let half = paint.stroke_width.max(0.0) * 0.5;
    let mut factor: f32 = 1.0;
    if paint.stroke_join == StrokeJoin::Miter {
        factor = factor.max(paint.stroke_miter_limit);
    }
    if paint.stroke_cap == StrokeCap::Square {
        factor = factor.max(SQRT_2);
    }
    // Hairlines still cover about one pixel
    (half * factor).max(0.5)
}

fn blur_outset(rect: Rect, paint: &Paint) -> Rect {
    match paint.blur_sigma() {
        Some(sigma) => rect.inflate(3.0 * sigma.abs()),
        None => rect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::{BlurStyle, MaskFilter};
    use crate::text::{GlyphQuad, TextShadow};
    use verso_core::Color;

    #[test]
    fn test_state_updates_have_no_bounds() {
        assert!(DrawCmd::Save.is_state_update());
        assert_eq!(DrawCmd::Save.bounds(), None);
        assert_eq!(DrawCmd::ClipRect(Rect::UNIT).bounds(), None);
    }

    #[test]
    fn test_fill_path_bounds() {
        let mut path = Path::new();
        path.add_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0));
        let cmd = DrawCmd::DrawPath {
            path,
            paint: Paint::fill(Color::RED),
        };
        assert!(!cmd.is_state_update());
        assert_eq!(cmd.bounds(), Some(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_stroke_and_blur_inflate_bounds() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0);
        path.line_to(10.0, 0.0);

        let paint = Paint::stroke(Color::RED, 4.0).with_stroke_join(StrokeJoin::Bevel);
        let cmd = DrawCmd::DrawPath {
            path: path.clone(),
            paint,
        };
        assert_eq!(cmd.bounds(), Some(Rect::from_ltrb(-2.0, -2.0, 12.0, 2.0)));

        let paint = Paint::stroke(Color::RED, 4.0)
            .with_stroke_join(StrokeJoin::Bevel)
            .with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 1.0));
        let cmd = DrawCmd::DrawPath { path, paint };
        assert_eq!(cmd.bounds(), Some(Rect::from_ltrb(-5.0, -5.0, 15.0, 5.0)));
    }

    #[test]
    fn test_image_bounds() {
        let cmd = DrawCmd::DrawImage {
            image: Image::new(20, 10),
            offset: Point::new(5.0, 5.0),
            paint: Paint::default(),
        };
        assert_eq!(cmd.bounds(), Some(Rect::from_ltwh(5.0, 5.0, 20.0, 10.0)));

        let dynamic = DrawCmd::DrawImage {
            image: Image::dynamic(1, 1),
            offset: Point::ZERO,
            paint: Paint::default(),
        };
        assert!(dynamic.is_dynamic());
    }

    #[test]
    fn test_text_bounds_include_shadows() {
        let blob = TextBlob::new(
            Image::new(8, 8),
            vec![GlyphQuad {
                rect: Rect::from_ltwh(0.0, 0.0, 10.0, 10.0),
                uv: Rect::UNIT,
            }],
        )
        .with_shadows(vec![TextShadow {
            color: Color::BLACK,
            offset: Point::new(5.0, 0.0),
            blur_radius: 1.0,
        }]);

        let cmd = DrawCmd::DrawTextBlob {
            blob,
            offset: Point::ZERO,
            paint: Paint::default(),
        };
        assert_eq!(cmd.bounds(), Some(Rect::from_ltrb(0.0, -3.0, 18.0, 13.0)));
    }
}
