//! Verso GPU
//!
//! Turns recorded [`verso_paint::Picture`]s into a flat list of backend
//! directives: render-target allocation, scissor and stencil state, and
//! triangle-list draws with their material and shader properties.
//!
//! # Features
//!
//! - Offscreen layers for `save_layer`, backdrop filters and mask blurs
//! - Clip stacks reduced to a scissor rect plus stencil masks
//! - Two-pass separable Gaussian blur with sigma down-scaling
//! - Gradient ramp textures and blur kernels cached across flushes
//! - Pooled vertex/index buffers
//!
//! The directives are backend-agnostic; any [`CommandBuffer`] can consume
//! them.

pub mod blur;
pub mod canvas;
pub mod clip;
pub mod command;
pub mod config;
pub mod error;
pub mod flusher;
pub mod gradient_cache;
pub mod image_mesh;
pub mod layer;
pub mod material;
pub mod pool;

pub use canvas::CommandBufferCanvas;
pub use command::{CommandBuffer, Directive, DrawMesh, RenderTargetId, TargetDescriptor};
pub use config::RendererConfig;
pub use error::{RenderError, Result};
pub use flusher::PictureFlusher;
pub use material::{
    BlendFactor, BlendState, Material, MaterialKind, PropertyBlock, ShaderPass, StencilPass,
    StencilTest, TexMode, TextureBinding,
};
pub use pool::{MeshBuffer, MeshPool, MeshVertex};
