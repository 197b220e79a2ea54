use verso_core::{Color, Point, Rect};
use verso_gpu::{
    CommandBufferCanvas, Directive, DrawMesh, MaterialKind, PictureFlusher, RenderError,
    RenderTargetId, RendererConfig, ShaderPass, StencilPass, StencilTest, TexMode,
    TextureBinding,
};
use verso_paint::{
    BlurStyle, Canvas, GlyphQuad, Image, ImageFilter, MaskFilter, Paint, PaintError, Path,
    Picture, RecordingCanvas, TextBlob, TextShadow,
};

fn record(draw: impl FnOnce(&mut RecordingCanvas)) -> Picture {
    let mut canvas = RecordingCanvas::default();
    draw(&mut canvas);
    canvas.end_recording().unwrap()
}

/// `RUST_LOG=verso_gpu=trace` shows skipped draws and layer allocation
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn flush(picture: &Picture) -> Vec<Directive> {
    init_tracing();
    let mut flusher = PictureFlusher::new(RendererConfig::default(), 100, 100).unwrap();
    let mut out = Vec::new();
    flusher.flush(picture, &mut out).unwrap();
    out
}

fn draws(directives: &[Directive]) -> Vec<&DrawMesh> {
    directives.iter().filter_map(Directive::as_draw_mesh).collect()
}

fn triangle(a: Point, b: Point, c: Point) -> Path {
    let mut path = Path::new();
    path.move_to(a.x, a.y);
    path.line_to(b.x, b.y);
    path.line_to(c.x, c.y);
    path.close();
    path
}

fn position(directives: &[Directive], pred: impl Fn(&Directive) -> bool) -> usize {
    directives.iter().position(pred).unwrap()
}

#[test]
fn solid_triangle_is_a_single_convex_draw() {
    let path = triangle(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0));
    let out = flush(&record(|canvas| canvas.draw_path(&path, &Paint::fill(Color::RED))));

    assert!(matches!(out[0], Directive::SetTarget(RenderTargetId::SURFACE)));
    assert!(matches!(out[1], Directive::ClearTarget(RenderTargetId::SURFACE)));
    assert!(matches!(out.last(), Some(Directive::DisableScissor)));

    let draws = draws(&out);
    assert_eq!(draws.len(), 1);
    let draw = draws[0];
    assert_eq!(draw.material.kind, MaterialKind::ConvexFill);
    assert_eq!(draw.material.clip_test, Some(StencilTest::Always));
    assert_eq!(draw.pass, ShaderPass::Solid.index());
    assert_eq!(draw.properties.color, Some(Color::RED));
    assert_eq!(draw.properties.viewport, [0.0, 0.0, 100.0, 100.0]);
    assert_eq!(draw.bounds, Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
    assert_eq!(draw.buffer.index_count(), 3);
}

#[test]
fn extra_restore_is_rejected_without_output() {
    let picture = record(|canvas| {
        canvas.draw_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::RED));
        canvas.restore();
    });

    let mut flusher = PictureFlusher::new(RendererConfig::default(), 100, 100).unwrap();
    let mut out = Vec::new();
    let err = flusher.flush(&picture, &mut out).unwrap_err();
    assert!(matches!(err, RenderError::UnmatchedSaveRestore));
    assert!(out.is_empty());

    // The flusher is still usable afterwards
    let ok = record(|canvas| canvas.draw_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::RED)));
    flusher.flush(&ok, &mut out).unwrap();
    assert_eq!(draws(&out).len(), 1);
}

#[test]
fn canvas_flush_reports_paint_error() {
    let mut canvas = CommandBufferCanvas::new(RendererConfig::default(), 100, 100, Vec::new()).unwrap();
    canvas.draw_rect(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::RED));
    canvas.restore();

    assert_eq!(canvas.flush().unwrap_err(), PaintError::UnmatchedSaveRestore);
}

#[test]
fn save_layer_renders_offscreen_then_composites() {
    let picture = record(|canvas| {
        canvas.save_layer(Rect::from_ltrb(10.0, 10.0, 50.0, 50.0), &Paint::default());
        canvas.draw_rect(Rect::from_ltrb(20.0, 20.0, 30.0, 30.0), &Paint::fill(Color::BLUE));
        canvas.restore();
    });
    let out = flush(&picture);
    let layer = RenderTargetId(1);

    let alloc = position(&out, |d| matches!(d, Directive::AllocateTarget { id, .. } if *id == layer));
    let set = position(&out, |d| matches!(d, Directive::SetTarget(id) if *id == layer));
    let release = position(&out, |d| matches!(d, Directive::ReleaseTarget(id) if *id == layer));
    assert!(alloc < set && set < release);

    let Directive::AllocateTarget { descriptor, .. } = &out[alloc] else {
        unreachable!()
    };
    assert_eq!((descriptor.width, descriptor.height), (40, 40));

    let draws = draws(&out);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].properties.viewport, [10.0, 10.0, 40.0, 40.0]);

    let composite = draws[1];
    assert_eq!(composite.material.kind, MaterialKind::Tex);
    assert_eq!(composite.properties.tex_mode, Some(TexMode::PreAlpha));
    assert_eq!(composite.properties.texture.as_ref().and_then(TextureBinding::target), Some(layer));
    assert_eq!(composite.bounds, Rect::from_ltrb(10.0, 10.0, 50.0, 50.0));
}

#[test]
fn mask_blur_runs_two_filter_passes() {
    let paint = Paint::fill(Color::BLACK).with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 4.0));
    let out = flush(&record(|canvas| {
        canvas.draw_rect(Rect::from_ltrb(20.0, 20.0, 40.0, 40.0), &paint)
    }));

    let allocations = out
        .iter()
        .filter(|d| matches!(d, Directive::AllocateTarget { .. }))
        .count();
    assert_eq!(allocations, 3);

    let draws = draws(&out);
    let filters: Vec<_> = draws
        .iter()
        .filter(|d| d.material.kind == MaterialKind::Filter)
        .collect();
    assert_eq!(filters.len(), 2);

    let x = filters[0].properties.blur.as_ref().unwrap();
    let y = filters[1].properties.blur.as_ref().unwrap();
    assert!(x.img_inc[0] > 0.0 && x.img_inc[1] == 0.0);
    assert!(y.img_inc[0] == 0.0 && y.img_inc[1] < 0.0);
    assert_eq!(x.kernel.len(), 2 * x.radius as usize + 1);

    // Mask is target 1; the horizontal pass reads it, the vertical pass reads target 2
    let source = |d: &DrawMesh| d.properties.texture.as_ref().and_then(TextureBinding::target);
    assert_eq!(source(*filters[0]), Some(RenderTargetId(1)));
    assert_eq!(source(*filters[1]), Some(RenderTargetId(2)));

    let last = draws.last().unwrap();
    assert_eq!(last.material.kind, MaterialKind::Tex);
    assert_eq!(source(*last), Some(RenderTargetId(3)));
    assert_eq!(last.bounds, Rect::from_ltrb(8.0, 8.0, 52.0, 52.0));
}

#[test]
fn backdrop_blur_samples_the_parent_target() {
    let paint = Paint::default().with_backdrop(ImageFilter::blur(3.0, 3.0));
    let out = flush(&record(|canvas| {
        canvas.draw_rect(Rect::from_ltrb(0.0, 0.0, 100.0, 100.0), &Paint::fill(Color::GREEN));
        canvas.save_layer(Rect::from_ltrb(25.0, 25.0, 75.0, 75.0), &paint);
        canvas.restore();
    }));

    let draws = draws(&out);
    let samples_surface = draws.iter().any(|d| {
        d.properties.texture.as_ref().and_then(TextureBinding::target) == Some(RenderTargetId::SURFACE)
    });
    assert!(samples_surface);
    assert_eq!(draws.iter().filter(|d| d.material.kind == MaterialKind::Filter).count(), 2);
}

#[test]
fn path_clip_writes_stencil_mask() {
    let clip = triangle(Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(0.0, 100.0));
    let out = flush(&record(|canvas| {
        canvas.clip_path(&clip);
        canvas.draw_rect(Rect::from_ltrb(40.0, 40.0, 80.0, 80.0), &Paint::fill(Color::RED));
    }));

    // Scissor in target pixels with a bottom-left origin
    assert!(out
        .iter()
        .any(|d| matches!(d, Directive::EnableScissor(r) if *r == Rect::from_ltrb(40.0, 20.0, 80.0, 60.0))));

    let draws = draws(&out);
    let stencil: Vec<u32> = draws
        .iter()
        .filter(|d| d.material.kind == MaterialKind::Stencil)
        .map(|d| d.pass)
        .collect();
    assert_eq!(
        stencil,
        vec![
            StencilPass::Clear.index(),
            StencilPass::Winding.index(),
            StencilPass::Cover.index(),
        ]
    );

    let fill = draws.last().unwrap();
    assert_eq!(fill.material.kind, MaterialKind::ConvexFill);
    assert_eq!(fill.material.clip_test, Some(StencilTest::Equal));
}

#[test]
fn nested_rect_clips_only_scissor() {
    let out = flush(&record(|canvas| {
        canvas.clip_rect(Rect::from_ltrb(10.0, 10.0, 90.0, 90.0));
        canvas.save();
        canvas.clip_rect(Rect::from_ltrb(20.0, 20.0, 50.0, 50.0));
        canvas.draw_rect(Rect::from_ltrb(0.0, 0.0, 100.0, 100.0), &Paint::fill(Color::RED));
        canvas.restore();
        canvas.draw_rect(Rect::from_ltrb(0.0, 0.0, 100.0, 100.0), &Paint::fill(Color::BLUE));
    }));

    let scissors: Vec<Rect> = out
        .iter()
        .filter_map(|d| match d {
            Directive::EnableScissor(rect) => Some(*rect),
            _ => None,
        })
        .collect();
    assert_eq!(
        scissors,
        vec![
            Rect::from_ltrb(20.0, 50.0, 50.0, 80.0),
            Rect::from_ltrb(10.0, 10.0, 90.0, 90.0),
        ]
    );
    assert!(draws(&out).iter().all(|d| d.material.kind != MaterialKind::Stencil));
}

#[test]
fn images_draw_as_textured_quads() {
    let image = Image::new(32, 16);
    let out = flush(&record(|canvas| {
        canvas.draw_image(&image, Point::new(5.0, 5.0), &Paint::default());
        canvas.draw_image(&Image::new(0, 0), Point::new(5.0, 5.0), &Paint::default());
    }));

    let draws = draws(&out);
    assert_eq!(draws.len(), 1);
    let draw = draws[0];
    assert_eq!(draw.material.kind, MaterialKind::Tex);
    assert_eq!(draw.properties.tex_mode, Some(TexMode::PostAlpha));
    assert_eq!(draw.properties.texture.as_ref().and_then(TextureBinding::image_id), Some(image.id()));
    assert_eq!(draw.bounds, Rect::from_ltrb(5.0, 5.0, 37.0, 21.0));
}

#[test]
fn text_shadows_draw_before_glyphs() {
    let glyphs = vec![GlyphQuad {
        rect: Rect::from_ltrb(0.0, 0.0, 8.0, 10.0),
        uv: Rect::from_ltrb(0.0, 0.0, 0.5, 0.5),
    }];
    let blob = TextBlob::new(Image::new(16, 16), glyphs).with_shadows(vec![TextShadow {
        color: Color::BLACK,
        offset: Point::new(2.0, 2.0),
        blur_radius: 0.0,
    }]);
    let out = flush(&record(|canvas| {
        canvas.draw_text_blob(&blob, Point::new(10.0, 10.0), &Paint::fill(Color::WHITE))
    }));

    let draws = draws(&out);
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|d| d.properties.tex_mode == Some(TexMode::AlphaOnly)));
    assert_eq!(draws[0].bounds, Rect::from_ltrb(12.0, 12.0, 20.0, 22.0));
    assert_eq!(draws[1].bounds, Rect::from_ltrb(10.0, 10.0, 18.0, 20.0));
}
