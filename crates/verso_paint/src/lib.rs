//! Verso Paint
//!
//! Resolution-independent drawing model for the Verso renderer.
//!
//! # Features
//!
//! - Paths with incremental bounds, shape hints and non-zero hit testing
//! - Adaptive Bézier flattening with a frame-expiring cache
//! - Fill meshes (convex fan or stencil fan + AA fringe) and stroke meshes
//!   with miter, bevel and round joins and butt, square and round caps
//! - Paints, gradients and image shaders
//! - Draw commands, the `Canvas` recording API and immutable `Picture`s
//! - Elevation shadows

pub mod canvas;
pub mod draw_cmd;
pub mod error;
pub mod image;
pub mod mesh;
pub mod paint;
pub mod path;
pub mod path_cache;
pub mod picture;
pub mod shader;
pub mod shadow;
pub mod stroke;
pub mod tessellation;
pub mod text;

pub use canvas::{Canvas, Paragraph, RecordingCanvas};
pub use draw_cmd::DrawCmd;
pub use error::{PaintError, Result};
pub use image::{Image, ImageId};
pub use mesh::Mesh;
pub use paint::{
    BlendMode, BlurStyle, ColorFilter, FilterMode, ImageFilter, MaskFilter, Paint, PaintingStyle,
    StrokeCap, StrokeJoin,
};
pub use path::{Path, PathCommand, PathShape, PathWinding};
pub use path_cache::{Contour, FillMesh, PathCache, StrokeParams};
pub use picture::{Picture, PictureRecorder};
pub use shader::{Gradient, GradientKind, ImageShader, Shader, TileMode};
pub use tessellation::TessellationCache;
pub use text::{GlyphQuad, TextBlob, TextShadow};
