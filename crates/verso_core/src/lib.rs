//! Verso Core
//!
//! Geometry shared by every stage of the renderer: points, sizes, edge-based
//! rectangles, rounded rectangles, the 2D affine [`Matrix`] and [`Color`].

pub mod color;
pub mod geometry;
pub mod matrix;

pub use color::Color;
pub use geometry::{Point, RRect, Radius, Rect, Size};
pub use matrix::Matrix;
