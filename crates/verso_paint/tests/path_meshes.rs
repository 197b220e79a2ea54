use std::f32::consts::PI;
use std::rc::Rc;

use verso_core::{Point, Rect};
use verso_paint::{Path, PathWinding, StrokeCap, StrokeJoin, StrokeParams, TessellationCache};

fn hexagon(radius: f32) -> Path {
    let points: Vec<Point> = (0..6)
        .map(|i| {
            let a = i as f32 * PI / 3.0;
            Point::new(radius * a.cos(), radius * a.sin())
        })
        .collect();
    let mut path = Path::new();
    path.add_polygon(&points, true);
    path
}

#[test]
fn rect_flattens_to_four_segments() {
    let mut path = Path::new();
    path.add_rect(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
    let mut tess = TessellationCache::new();

    let cache = path.flatten(1.0, &mut tess);
    let contours = cache.contours();
    assert_eq!(contours.len(), 1);

    // Closed contour: 4 points make 4 segments
    let contour = &contours[0];
    assert!(contour.closed);
    assert_eq!(contour.points.len(), 4);
    assert_eq!(Rect::from_points(&contour.points), Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
    assert_eq!(path.bounds(), Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
}

#[test]
fn flatten_is_reference_stable_within_a_scale_bucket() {
    let mut path = Path::new();
    path.add_circle(Point::new(50.0, 50.0), 40.0);
    let mut tess = TessellationCache::new();

    let a = path.flatten(2.0, &mut tess);
    let b = path.flatten(2.0, &mut tess);
    assert!(Rc::ptr_eq(&a, &b));

    let c = path.flatten(2.2, &mut tess);
    assert!(Rc::ptr_eq(&a, &c));
}

#[test]
fn higher_scale_flattens_finer() {
    let mut path = Path::new();
    path.add_circle(Point::new(0.0, 0.0), 100.0);
    let mut tess = TessellationCache::new();

    let coarse = path.flatten(1.0, &mut tess).contours()[0].points.len();
    let fine = path.flatten(4.0, &mut tess).contours()[0].points.len();
    assert!(fine > coarse, "{} should exceed {}", fine, coarse);
}

#[test]
fn closed_stroke_has_two_vertices_per_corner_plus_wrap() {
    let path = hexagon(20.0);
    let mut tess = TessellationCache::new();
    let cache = path.flatten(1.0, &mut tess);

    let mesh = cache.stroke_mesh(StrokeParams {
        half_width: 1.0,
        cap: StrokeCap::Butt,
        join: StrokeJoin::Miter,
        miter_limit: 4.0,
    });
    assert_eq!(mesh.vertices().len(), 2 * 6 + 2);
}

#[test]
fn convex_shapes_skip_the_stencil_path() {
    let mut tess = TessellationCache::new();

    let fill = hexagon(20.0).flatten(1.0, &mut tess).fill_mesh(1.0);
    assert!(fill.convex);
    assert!(fill.fringe.is_none());
    assert_eq!(fill.mesh.triangles().len(), (6 - 2) * 3);

    // Reversed winding does not change convexity
    let mut reversed = hexagon(20.0);
    reversed.winding(PathWinding::Clockwise);
    let fill = reversed.flatten(1.0, &mut tess).fill_mesh(1.0);
    assert!(fill.convex);
}

#[test]
fn tessellator_entries_expire_after_unused_frames() {
    let mut tess = TessellationCache::with_ttl(1);
    let mut path = Path::new();
    path.add_circle(Point::new(0.0, 0.0), 10.0);
    path.flatten(1.0, &mut tess);
    assert!(!tess.is_empty());

    tess.tick_next_frame();
    tess.tick_next_frame();
    assert!(tess.is_empty());
}
