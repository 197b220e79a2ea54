//! Triangle meshes produced by the tessellator
//!
//! Vertex data lives behind an `Rc` so a mesh can be re-used under several
//! transforms (`Mesh::transform`) without copying. World bounds and the
//! bounding-quad mesh are computed on first use.

use std::cell::OnceCell;
use std::rc::Rc;

use verso_core::{Matrix, Point, Rect};

/// Raw vertex data shared between mesh instances
#[derive(Debug)]
pub struct MeshData {
    pub vertices: Vec<Point>,
    pub triangles: Vec<u32>,
    pub uv: Option<Vec<Point>>,
    raw_bounds: Rect,
}

/// Vertex positions, UVs and triangle indices with an optional transform
#[derive(Clone, Debug)]
pub struct Mesh {
    data: Rc<MeshData>,
    matrix: Option<Matrix>,
    bounds: OnceCell<Rect>,
    bounds_mesh: OnceCell<Rc<Mesh>>,
}

impl Mesh {
    pub fn new(
        matrix: Option<Matrix>,
        vertices: Vec<Point>,
        triangles: Vec<u32>,
        uv: Option<Vec<Point>>,
    ) -> Self {
        debug_assert!(
            uv.as_ref().map_or(true, |uv| uv.len() == vertices.len()),
            "uv count must match vertex count"
        );
        debug_assert!(triangles.len() % 3 == 0);
        let raw_bounds = Rect::from_points(&vertices);
        Self {
            data: Rc::new(MeshData {
                vertices,
                triangles,
                uv,
                raw_bounds,
            }),
            matrix,
            bounds: OnceCell::new(),
            bounds_mesh: OnceCell::new(),
        }
    }

    /// Two triangles covering `rect`
    pub fn from_rect(rect: &Rect) -> Self {
        let vertices = vec![
            Point::new(rect.right, rect.bottom),
            Point::new(rect.right, rect.top),
            Point::new(rect.left, rect.bottom),
            Point::new(rect.left, rect.top),
        ];
        Self::new(None, vertices, vec![0, 2, 1, 1, 2, 3], None)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.data.vertices
    }

    pub fn triangles(&self) -> &[u32] {
        &self.data.triangles
    }

    pub fn uv(&self) -> Option<&[Point]> {
        self.data.uv.as_deref()
    }

    pub fn matrix(&self) -> Option<&Matrix> {
        self.matrix.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.data.triangles.is_empty()
    }

    /// Bounds of the untransformed vertices
    pub fn raw_bounds(&self) -> Rect {
        self.data.raw_bounds
    }

    /// Bounds after applying the mesh matrix
    pub fn bounds(&self) -> Rect {
        *self.bounds.get_or_init(|| match &self.matrix {
            Some(m) => m.map_rect(&self.data.raw_bounds),
            None => self.data.raw_bounds,
        })
    }

    /// Quad covering `bounds()`, used to cover stencilled regions
    pub fn bounds_mesh(&self) -> Rc<Mesh> {
        self.bounds_mesh
            .get_or_init(|| Rc::new(Mesh::from_rect(&self.bounds())))
            .clone()
    }

    /// Same vertex data placed under `matrix`
    pub fn transform(&self, matrix: &Matrix) -> Mesh {
        Mesh {
            data: self.data.clone(),
            matrix: Some(*matrix),
            bounds: OnceCell::new(),
            bounds_mesh: OnceCell::new(),
        }
    }

    /// True when both meshes share vertex storage
    pub fn shares_data(&self, other: &Mesh) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_mesh_bounds() {
        let mesh = Mesh::from_rect(&Rect::from_ltrb(1.0, 2.0, 3.0, 4.0));
        assert_eq!(mesh.bounds(), Rect::from_ltrb(1.0, 2.0, 3.0, 4.0));
        assert_eq!(mesh.triangles(), &[0, 2, 1, 1, 2, 3]);
    }

    #[test]
    fn test_transform_shares_data() {
        let mesh = Mesh::from_rect(&Rect::from_ltwh(0.0, 0.0, 10.0, 10.0));
        let moved = mesh.transform(&Matrix::translation(5.0, 5.0));

        assert!(mesh.shares_data(&moved));
        assert_eq!(moved.bounds(), Rect::from_ltwh(5.0, 5.0, 10.0, 10.0));
        assert_eq!(moved.raw_bounds(), mesh.raw_bounds());
    }

    #[test]
    fn test_bounds_mesh_is_cached() {
        let mesh = Mesh::from_rect(&Rect::from_ltwh(0.0, 0.0, 10.0, 10.0))
            .transform(&Matrix::scale(2.0, 2.0));
        let a = mesh.bounds_mesh();
        let b = mesh.bounds_mesh();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.bounds(), Rect::from_ltwh(0.0, 0.0, 20.0, 20.0));
    }
}
