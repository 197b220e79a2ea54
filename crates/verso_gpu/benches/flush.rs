use criterion::{black_box, criterion_group, criterion_main, Criterion};
use verso_core::{Color, Point, RRect, Rect};
use verso_gpu::{Directive, PictureFlusher, RendererConfig};
use verso_paint::{BlurStyle, Canvas, MaskFilter, Paint, Picture, RecordingCanvas};

/// A grid of rounded cards, each clipped and with a blurred shadow
fn card_grid(rows: usize, cols: usize) -> Picture {
    let mut canvas = RecordingCanvas::new(2.0);
    let shadow = Paint::fill(Color::BLACK).with_mask_filter(MaskFilter::blur(BlurStyle::Normal, 6.0));
    for row in 0..rows {
        for col in 0..cols {
            let rect = Rect::from_ltwh(col as f32 * 120.0 + 10.0, row as f32 * 90.0 + 10.0, 100.0, 70.0);
            let rrect = RRect::from_rect_radius(rect, 12.0);
            canvas.save();
            canvas.draw_rrect(&rrect, &shadow);
            canvas.clip_rrect(rrect);
            canvas.draw_rect(rect, &Paint::fill(Color::WHITE));
            canvas.draw_circle(rect.top_left() + Point::new(24.0, 24.0), 14.0, &Paint::fill(Color::BLUE));
            canvas.restore();
        }
    }
    // end_recording only fails on unbalanced saves
    canvas.end_recording().unwrap()
}

fn bench_flush(c: &mut Criterion) {
    let config = RendererConfig::default().with_device_pixel_ratio(2.0);
    let picture = card_grid(6, 8);

    c.bench_function("flush_card_grid_warm", |b| {
        let mut flusher = PictureFlusher::new(config.clone(), 1920, 1080).unwrap();
        let mut out: Vec<Directive> = Vec::new();
        b.iter(|| {
            out.clear();
            flusher.flush(black_box(&picture), &mut out).unwrap();
            black_box(out.len());
        })
    });

    c.bench_function("flush_card_grid_cold", |b| {
        b.iter(|| {
            let mut flusher = PictureFlusher::new(config.clone(), 1920, 1080).unwrap();
            let mut out: Vec<Directive> = Vec::new();
            flusher.flush(black_box(&picture), &mut out).unwrap();
            black_box(out.len());
        })
    });
}

criterion_group!(benches, bench_flush);
criterion_main!(benches);
