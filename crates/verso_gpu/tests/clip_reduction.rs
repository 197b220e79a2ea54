use verso_core::{Matrix, Point, Rect};
use verso_gpu::clip::{ClipGenIds, ClipStack, ReducedClip, WIDE_OPEN_GEN_ID};
use verso_paint::{Path, TessellationCache};

fn rect_path(rect: Rect) -> Path {
    let mut path = Path::new();
    path.add_rect(rect);
    path
}

const LAYER: Rect = Rect::from_ltrb(0.0, 0.0, 200.0, 200.0);

#[test]
fn nested_rect_reduces_to_scissor() {
    let mut tess = TessellationCache::new();
    let mut ids = ClipGenIds::new();
    let mut stack = ClipStack::new();

    stack.clip_path(&rect_path(Rect::from_ltrb(0.0, 0.0, 100.0, 100.0)), &Matrix::IDENTITY, 1.0, &mut tess, &mut ids);
    stack.save();
    stack.clip_path(&rect_path(Rect::from_ltrb(10.0, 10.0, 50.0, 50.0)), &Matrix::IDENTITY, 1.0, &mut tess, &mut ids);

    let reduced = ReducedClip::new(&stack, LAYER, Rect::from_ltrb(0.0, 0.0, 100.0, 100.0));
    assert_eq!(reduced.scissor, Rect::from_ltrb(10.0, 10.0, 50.0, 50.0));
    assert!(reduced.mask_elements.is_empty());
    assert_eq!(reduced.mask_gen_id(), WIDE_OPEN_GEN_ID);
}

#[test]
fn circle_containing_query_needs_no_mask() {
    let mut tess = TessellationCache::new();
    let mut ids = ClipGenIds::new();
    let mut stack = ClipStack::new();
    let mut circle = Path::new();
    circle.add_circle(Point::new(50.0, 50.0), 50.0);
    stack.clip_path(&circle, &Matrix::IDENTITY, 1.0, &mut tess, &mut ids);

    let inside = ReducedClip::new(&stack, LAYER, Rect::from_ltrb(20.0, 20.0, 60.0, 60.0));
    assert!(inside.mask_elements.is_empty());
    assert_eq!(inside.scissor, Rect::from_ltrb(20.0, 20.0, 60.0, 60.0));

    let corner = ReducedClip::new(&stack, LAYER, Rect::from_ltrb(0.0, 0.0, 30.0, 30.0));
    assert_eq!(corner.mask_elements.len(), 1);
}

#[test]
fn transformed_rect_clip_stays_a_rect() {
    let mut tess = TessellationCache::new();
    let mut ids = ClipGenIds::new();
    let mut stack = ClipStack::new();
    let mut matrix = Matrix::translation(10.0, 20.0);
    matrix.pre_scale(2.0, 2.0);
    stack.clip_path(&rect_path(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0)), &matrix, 2.0, &mut tess, &mut ids);

    assert!(stack.elements()[0].is_rect());
    assert_eq!(stack.bounds(), Some((Rect::from_ltrb(10.0, 20.0, 30.0, 40.0), true)));
}

#[test]
fn rotated_rect_clip_is_masked() {
    let mut tess = TessellationCache::new();
    let mut ids = ClipGenIds::new();
    let mut stack = ClipStack::new();
    let matrix = Matrix::rotation_about(std::f32::consts::FRAC_PI_4, Point::new(50.0, 50.0));
    stack.clip_path(&rect_path(Rect::from_ltrb(25.0, 25.0, 75.0, 75.0)), &matrix, 1.0, &mut tess, &mut ids);

    assert!(!stack.elements()[0].is_rect());
    let reduced = ReducedClip::new(&stack, LAYER, Rect::from_ltrb(0.0, 0.0, 100.0, 100.0));
    assert_eq!(reduced.mask_elements.len(), 1);
}

#[test]
fn generation_ids_strictly_increase() {
    let mut tess = TessellationCache::new();
    let mut ids = ClipGenIds::new();
    let mut stack = ClipStack::new();

    let mut seen = Vec::new();
    for i in 0..4 {
        stack.save();
        let inset = i as f32 * 5.0;
        stack.clip_path(
            &rect_path(Rect::from_ltrb(inset, inset, 100.0 - inset, 100.0 - inset)),
            &Matrix::IDENTITY,
            1.0,
            &mut tess,
            &mut ids,
        );
        seen.push(stack.elements().last().unwrap().gen_id());
    }

    assert!(seen[0] > WIDE_OPEN_GEN_ID);
    assert!(seen.windows(2).all(|w| w[1] > w[0]));

    // Ids are never handed out again after a restore
    stack.restore();
    stack.save();
    stack.clip_path(&rect_path(Rect::from_ltrb(40.0, 40.0, 60.0, 60.0)), &Matrix::IDENTITY, 1.0, &mut tess, &mut ids);
    assert!(stack.elements().last().unwrap().gen_id() > seen[3]);
}
