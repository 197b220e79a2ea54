//! Textured quad meshes for images, layers and glyph runs
//!
//! UVs are normalized with V flipped (`v = 1 - y`), matching render targets
//! whose origin is the bottom-left corner. Every quad is emitted with both
//! windings so mirrored transforms survive back-face culling.

use verso_core::{Matrix, Point, Rect};
use verso_paint::{Mesh, TextBlob};

const QUAD_TRIANGLES: [u32; 12] = [0, 1, 2, 0, 2, 1, 0, 2, 3, 0, 3, 2];

/// Corner `i` of a 4×4 vertex grid is `row * 4 + col`
#[rustfmt::skip]
const NINE_TRIANGLES: [u32; 108] = [
    0, 4, 1, 1, 4, 5,
    0, 1, 4, 1, 5, 4,
    1, 5, 2, 2, 5, 6,
    1, 2, 5, 2, 6, 5,
    2, 6, 3, 3, 6, 7,
    2, 3, 6, 3, 7, 6,
    4, 8, 5, 5, 8, 9,
    4, 5, 8, 5, 9, 8,
    5, 9, 6, 6, 9, 10,
    5, 6, 9, 6, 10, 9,
    6, 10, 7, 7, 10, 11,
    6, 7, 10, 7, 11, 10,
    8, 12, 9, 9, 12, 13,
    8, 9, 12, 9, 13, 12,
    9, 13, 10, 10, 13, 14,
    9, 10, 13, 10, 14, 13,
    10, 14, 11, 11, 14, 15,
    10, 11, 14, 11, 15, 14,
];

fn flip(p: Point) -> Point {
    Point::new(p.x, 1.0 - p.y)
}

fn dst_corners(dst: &Rect) -> Vec<Point> {
    vec![
        dst.top_left(),
        dst.bottom_left(),
        dst.bottom_right(),
        dst.top_right(),
    ]
}

/// Quad covering `dst` sampling the normalized `src` rect
pub fn image_mesh(matrix: Option<Matrix>, src: &Rect, dst: &Rect) -> Mesh {
    image_mesh_quad(
        matrix,
        [
            src.top_left(),
            src.bottom_left(),
            src.bottom_right(),
            src.top_right(),
        ],
        dst,
    )
}

/// Quad covering `dst` with arbitrary UVs for its corners
///
/// `uvs` are ordered top-left, bottom-left, bottom-right, top-right.
pub fn image_mesh_quad(matrix: Option<Matrix>, uvs: [Point; 4], dst: &Rect) -> Mesh {
    let uv = uvs.iter().copied().map(flip).collect();
    Mesh::new(matrix, dst_corners(dst), QUAD_TRIANGLES.to_vec(), Some(uv))
}

/// Nine-patch mesh stretching only the `center` region of `src`
///
/// `src` and `center` are normalized; `border_size` is the size the full
/// source occupies in `dst` units, used to keep the borders unscaled.
pub fn image_nine_mesh(
    matrix: Option<Matrix>,
    src: &Rect,
    center: &Rect,
    border_size: (f32, f32),
    dst: &Rect,
) -> Mesh {
    let (src_width, src_height) = border_size;
    let xs = [
        dst.left,
        dst.left + (center.left - src.left) * src_width,
        dst.right - (src.right - center.right) * src_width,
        dst.right,
    ];
    let ys = [
        dst.top,
        dst.top + (center.top - src.top) * src_height,
        dst.bottom - (src.bottom - center.bottom) * src_height,
        dst.bottom,
    ];
    let txs = [src.left, center.left, center.right, src.right];
    let tys = [src.top, center.top, center.bottom, src.bottom];

    let mut vertices = Vec::with_capacity(16);
    let mut uv = Vec::with_capacity(16);
    for row in 0..4 {
        for col in 0..4 {
            vertices.push(Point::new(xs[col], ys[row]));
            uv.push(Point::new(txs[col], 1.0 - tys[row]));
        }
    }

    Mesh::new(matrix, vertices, NINE_TRIANGLES.to_vec(), Some(uv))
}

/// One textured quad per glyph of `blob`, in text space
pub fn text_mesh(matrix: Matrix, blob: &TextBlob) -> Mesh {
    let glyphs = blob.glyphs();
    let mut vertices = Vec::with_capacity(glyphs.len() * 4);
    let mut uv = Vec::with_capacity(glyphs.len() * 4);
    let mut triangles = Vec::with_capacity(glyphs.len() * QUAD_TRIANGLES.len());

    for glyph in glyphs {
        let base = vertices.len() as u32;
        vertices.extend(dst_corners(&glyph.rect));
        uv.extend(
            [
                glyph.uv.top_left(),
                glyph.uv.bottom_left(),
                glyph.uv.bottom_right(),
                glyph.uv.top_right(),
            ]
            .map(flip),
        );
        triangles.extend(QUAD_TRIANGLES.iter().map(|i| base + i));
    }

    Mesh::new(Some(matrix), vertices, triangles, Some(uv))
}
