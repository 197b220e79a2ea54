//! Render layer arena
//!
//! The flusher keeps one [`RenderLayer`] per `save_layer` (plus the root and
//! the temporary mask/blur layers) in a `SlotMap`. Layers reference each other
//! by [`LayerKey`]; tearing down the tree is clearing the map.

use std::rc::Rc;

use slotmap::new_key_type;
use verso_core::{Matrix, Rect};
use verso_paint::{FilterMode, Mesh, Paint};

use crate::clip::{ClipStack, EMPTY_GEN_ID};
use crate::command::RenderTargetId;
use crate::material::{Material, PropertyBlock};

new_key_type! {
    /// Handle to a layer in the flusher's arena
    pub struct LayerKey;
}

/// Transform state saved and restored with `save`/`restore`
#[derive(Clone, Debug)]
pub struct LayerState {
    matrix: Matrix,
    scale: f32,
    inverse: Option<Matrix>,
}

impl Default for LayerState {
    fn default() -> Self {
        Self::new(Matrix::IDENTITY)
    }
}

impl LayerState {
    pub fn new(matrix: Matrix) -> Self {
        Self {
            matrix,
            scale: matrix.scale_factor(),
            inverse: matrix.invert(),
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Scale factor of the transform, used to pick tessellation tolerances
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_matrix(&mut self, matrix: Matrix) {
        *self = Self::new(matrix);
    }

    /// Inverse transform; identity for singular matrices
    pub fn inverse(&self) -> Matrix {
        match self.inverse {
            Some(inverse) => inverse,
            None => {
                tracing::warn!("singular canvas matrix {:?}, using identity inverse", self.matrix);
                Matrix::IDENTITY
            }
        }
    }
}

/// A draw resolved to material, pass and properties
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub material: Material,
    pub pass: u32,
    pub properties: PropertyBlock,
    pub mesh: Rc<Mesh>,
}

/// Entry in a layer's draw list
#[derive(Clone, Debug)]
pub enum RenderCmd {
    /// Render the child layer into its own target before continuing
    Layer(LayerKey),
    Draw(DrawRecord),
    /// `None` disables the scissor
    Scissor(Option<Rect>),
}

/// Offscreen target plus everything drawn into it
#[derive(Debug)]
pub struct RenderLayer {
    pub target: RenderTargetId,
    pub width: u32,
    pub height: u32,
    pub filter_mode: FilterMode,
    pub no_msaa: bool,
    /// Region of the parent's space covered by the target
    pub layer_bounds: Rect,
    /// Paint used to composite the layer back into its parent
    pub layer_paint: Option<Paint>,
    pub draws: Vec<RenderCmd>,
    pub children: Vec<LayerKey>,
    pub parent: Option<LayerKey>,
    pub clip_stack: ClipStack,
    pub last_clip_gen_id: u32,
    pub last_clip_bounds: Rect,
    /// Stencil test disabled while no mask is active
    pub ignore_clip: bool,
    state: LayerState,
    saved: Vec<LayerState>,
}

impl RenderLayer {
    pub fn new(target: RenderTargetId, width: u32, height: u32, layer_bounds: Rect) -> Self {
        Self {
            target,
            width,
            height,
            filter_mode: FilterMode::Bilinear,
            no_msaa: false,
            layer_bounds,
            layer_paint: None,
            draws: Vec::new(),
            children: Vec::new(),
            parent: None,
            clip_stack: ClipStack::new(),
            last_clip_gen_id: EMPTY_GEN_ID,
            last_clip_bounds: Rect::ZERO,
            ignore_clip: true,
            state: LayerState::default(),
            saved: Vec::new(),
        }
    }

    pub fn with_paint(mut self, paint: Paint) -> Self {
        self.layer_paint = Some(paint);
        self
    }

    pub fn with_filter_mode(mut self, filter_mode: FilterMode) -> Self {
        self.filter_mode = filter_mode;
        self
    }

    pub fn without_msaa(mut self) -> Self {
        self.no_msaa = true;
        self
    }

    /// `[left, top, width, height]` of the layer bounds
    pub fn viewport(&self) -> [f32; 4] {
        let b = &self.layer_bounds;
        [b.left, b.top, b.width(), b.height()]
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    /// Number of open `save`s inside this layer
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn save(&mut self) {
        self.saved.push(self.state.clone());
        self.clip_stack.save();
    }

    /// Pop one saved state; false when only the layer's base state remains
    pub fn restore(&mut self) -> bool {
        match self.saved.pop() {
            Some(state) => {
                self.state = state;
                self.clip_stack.restore();
                true
            }
            None => false,
        }
    }

    pub fn add_draw(&mut self, record: DrawRecord) {
        self.draws.push(RenderCmd::Draw(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_matches_bounds() {
        let layer = RenderLayer::new(RenderTargetId(3), 20, 10, Rect::from_ltrb(5.0, 5.0, 15.0, 10.0));
        assert_eq!(layer.viewport(), [5.0, 5.0, 10.0, 5.0]);
        assert!(layer.ignore_clip);
    }

    #[test]
    fn test_save_restore_states() {
        let mut layer = RenderLayer::new(RenderTargetId::SURFACE, 10, 10, Rect::from_ltrb(0.0, 0.0, 10.0, 10.0));
        layer.save();
        layer.state_mut().set_matrix(Matrix::scale(2.0, 2.0));
        assert_eq!(layer.state().scale(), 2.0);
        assert_eq!(layer.save_depth(), 1);

        assert!(layer.restore());
        assert!(layer.state().matrix().is_identity());
        assert!(!layer.restore());
    }

    #[test]
    fn test_singular_inverse_falls_back() {
        let state = LayerState::new(Matrix::scale(0.0, 1.0));
        assert!(state.inverse().is_identity());

        let state = LayerState::new(Matrix::translation(3.0, 4.0));
        assert_eq!(state.inverse(), Matrix::translation(-3.0, -4.0));
    }
}
