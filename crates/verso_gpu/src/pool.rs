//! Reusable vertex/index buffers
//!
//! Every draw checks out a [`MeshBuffer`] while the layer tree is emitted.
//! Buffers come back to the pool at the end of the flush once the command
//! buffer has let go of them.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use verso_paint::Mesh;

/// Buffers kept for reuse; extra buffers are dropped
const MAX_FREE_BUFFERS: usize = 256;

/// Vertex layout uploaded to the GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// CPU-side copy of one mesh, ready for upload
#[derive(Debug, Default)]
pub struct MeshBuffer {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    fn fill(&mut self, mesh: &Mesh) {
        self.vertices.clear();
        self.indices.clear();

        let uv = mesh.uv();
        self.vertices
            .extend(mesh.vertices().iter().enumerate().map(|(i, p)| MeshVertex {
                position: [p.x, p.y],
                uv: uv.map_or([0.0, 0.0], |uv| [uv[i].x, uv[i].y]),
            }));
        self.indices.extend_from_slice(mesh.triangles());
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Pool of [`MeshBuffer`]s shared by all flushes of one renderer
#[derive(Debug, Default)]
pub struct MeshPool {
    free: Vec<MeshBuffer>,
    in_flight: Vec<Rc<MeshBuffer>>,
}

impl MeshPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `mesh` into a pooled buffer
    pub fn checkout(&mut self, mesh: &Mesh) -> Rc<MeshBuffer> {
        let mut buffer = self.free.pop().unwrap_or_default();
        buffer.fill(mesh);
        let buffer = Rc::new(buffer);
        self.in_flight.push(buffer.clone());
        buffer
    }

    /// Take back every buffer no longer referenced elsewhere
    ///
    /// Returns the number of buffers recovered.
    pub fn reclaim(&mut self) -> usize {
        let mut recovered = 0;
        for buffer in self.in_flight.drain(..) {
            if let Ok(buffer) = Rc::try_unwrap(buffer) {
                recovered += 1;
                if self.free.len() < MAX_FREE_BUFFERS {
                    self.free.push(buffer);
                }
            }
        }
        recovered
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
