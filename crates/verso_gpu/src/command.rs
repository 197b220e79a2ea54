//! Abstract GPU command stream
//!
//! A flush produces an ordered list of [`Directive`]s. Backends implement
//! [`CommandBuffer`] to translate them into API calls; `Vec<Directive>`
//! implements it too, which is what tests inspect.

use std::rc::Rc;

use verso_core::{Matrix, Rect};
use verso_paint::FilterMode;

use crate::material::{Material, PropertyBlock};
use crate::pool::MeshBuffer;

/// Offscreen render target handle, valid for one flush
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

impl RenderTargetId {
    /// The surface the flusher renders into
    pub const SURFACE: RenderTargetId = RenderTargetId(0);

    pub fn is_surface(self) -> bool {
        self == Self::SURFACE
    }
}

/// Size and sampling of a temporary render target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub filter_mode: FilterMode,
    /// 0 when multisampling is off
    pub msaa_samples: u32,
}

/// One triangle-list draw
#[derive(Clone, Debug)]
pub struct DrawMesh {
    pub material: Material,
    /// Shader pass index within the material
    pub pass: u32,
    pub properties: PropertyBlock,
    /// Transform applied to the buffer's positions in the vertex shader
    pub matrix: Matrix,
    /// Bounds of the transformed mesh, in layer space
    pub bounds: Rect,
    pub buffer: Rc<MeshBuffer>,
}

/// A single command-buffer operation
#[derive(Clone, Debug)]
pub enum Directive {
    AllocateTarget {
        id: RenderTargetId,
        descriptor: TargetDescriptor,
    },
    ReleaseTarget(RenderTargetId),
    SetTarget(RenderTargetId),
    /// Clear color, depth and stencil to zero
    ClearTarget(RenderTargetId),
    /// Scissor in target pixels, origin at the bottom-left corner
    EnableScissor(Rect),
    DisableScissor,
    DrawMesh(DrawMesh),
}

impl Directive {
    pub fn as_draw_mesh(&self) -> Option<&DrawMesh> {
        match self {
            Directive::DrawMesh(draw) => Some(draw),
            _ => None,
        }
    }
}

/// Sink for directives produced by a flush
pub trait CommandBuffer {
    fn submit(&mut self, directive: Directive);
}

impl CommandBuffer for Vec<Directive> {
    fn submit(&mut self, directive: Directive) {
        self.push(directive);
    }
}
