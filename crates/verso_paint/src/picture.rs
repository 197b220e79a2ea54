//! Immutable display lists and their recorder
//!
//! The recorder mirrors the canvas state stack while commands are appended so
//! it can accumulate a conservative device-space `paint_bounds`:
//!
//! ```text
//! save        → push copy of (xform, scissor)
//! save_layer  → push fresh state in layer space (origin at rect.top_left)
//! restore     → pop; layer bounds are shifted back and mapped by the parent
//! clip_*      → scissor ∩= xform.map_rect(clip bounds)
//! draw_*      → paint_bounds ∪= xform.map_rect(cmd.bounds()) ∩ scissor
//! ```

use std::rc::Rc;

use verso_core::{Matrix, Point, Rect};

use crate::draw_cmd::DrawCmd;
use crate::error::{PaintError, Result};

#[derive(Debug)]
struct PictureInner {
    draw_cmds: Vec<DrawCmd>,
    paint_bounds: Rect,
    is_dynamic: bool,
}

/// Recorded, immutable list of draw commands
///
/// Cloning shares the command list.
#[derive(Clone, Debug)]
pub struct Picture {
    inner: Rc<PictureInner>,
}

impl PartialEq for Picture {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Picture {
    pub fn draw_cmds(&self) -> &[DrawCmd] {
        &self.inner.draw_cmds
    }

    /// Conservative device-space bounds of everything the picture paints
    pub fn paint_bounds(&self) -> Rect {
        self.inner.paint_bounds
    }

    /// Whether replaying may produce different pixels each frame
    pub fn is_dynamic(&self) -> bool {
        self.inner.is_dynamic
    }

    pub fn is_empty(&self) -> bool {
        self.inner.draw_cmds.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
struct RecorderState {
    xform: Matrix,
    scissor: Option<Rect>,
    save_layer: bool,
    layer_offset: Point,
    paint_bounds: Rect,
}

impl RecorderState {
    fn root() -> Self {
        Self {
            xform: Matrix::IDENTITY,
            scissor: None,
            save_layer: false,
            layer_offset: Point::ZERO,
            paint_bounds: Rect::ZERO,
        }
    }

    fn copy(&self) -> Self {
        Self {
            save_layer: false,
            layer_offset: Point::ZERO,
            ..*self
        }
    }
}

/// Builds a [`Picture`] from a stream of draw commands
#[derive(Debug)]
pub struct PictureRecorder {
    draw_cmds: Vec<DrawCmd>,
    states: Vec<RecorderState>,
    is_dynamic: bool,
}

impl Default for PictureRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureRecorder {
    pub fn new() -> Self {
        Self {
            draw_cmds: Vec::with_capacity(128),
            states: vec![RecorderState::root()],
            is_dynamic: false,
        }
    }

    /// Drop all recorded commands and state
    pub fn reset(&mut self) {
        self.draw_cmds.clear();
        self.states.clear();
        self.states.push(RecorderState::root());
        self.is_dynamic = false;
    }

    /// Number of states on the stack, starting at 1
    pub fn save_count(&self) -> usize {
        self.states.len()
    }

    pub fn total_matrix(&self) -> Matrix {
        self.state().xform
    }

    pub fn is_empty(&self) -> bool {
        self.draw_cmds.is_empty()
    }

    fn state(&self) -> &RecorderState {
        // The root state is never popped
        &self.states[self.states.len() - 1]
    }

    fn state_mut(&mut self) -> &mut RecorderState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Finish recording; the recorder is left empty
    ///
    /// Fails when a `save` or `save_layer` is still open.
    pub fn end_recording(&mut self) -> Result<Picture> {
        if self.states.len() > 1 {
            return Err(PaintError::UnmatchedSaveRestore);
        }

        let paint_bounds = self.state().paint_bounds;
        let picture = Picture {
            inner: Rc::new(PictureInner {
                draw_cmds: std::mem::take(&mut self.draw_cmds),
                paint_bounds,
                is_dynamic: self.is_dynamic,
            }),
        };
        self.reset();
        Ok(picture)
    }

    pub fn add_draw_cmd(&mut self, cmd: DrawCmd) {
        self.is_dynamic |= cmd.is_dynamic();

        match &cmd {
            DrawCmd::Save => {
                let copy = self.state().copy();
                self.states.push(copy);
            }
            DrawCmd::SaveLayer { rect, .. } => {
                self.states.push(RecorderState {
                    xform: Matrix::IDENTITY,
                    scissor: Some(rect.shift(-rect.top_left())),
                    save_layer: true,
                    layer_offset: rect.top_left(),
                    paint_bounds: Rect::ZERO,
                });
            }
            DrawCmd::Restore => self.restore(),
            DrawCmd::Translate { dx, dy } => self.state_mut().xform.pre_translate(*dx, *dy),
            DrawCmd::Scale { sx, sy } => self.state_mut().xform.pre_scale(*sx, *sy),
            DrawCmd::Rotate { radians, pivot } => {
                let rotation = Matrix::rotation_about(*radians, pivot.unwrap_or(Point::ZERO));
                self.state_mut().xform.pre_concat(&rotation);
            }
            DrawCmd::Skew { sx, sy } => self.state_mut().xform.pre_concat(&Matrix::skew(*sx, *sy)),
            DrawCmd::Concat(matrix) => self.state_mut().xform.pre_concat(matrix),
            DrawCmd::ResetMatrix => self.state_mut().xform = Matrix::IDENTITY,
            DrawCmd::SetMatrix(matrix) => self.state_mut().xform = *matrix,
            DrawCmd::ClipRect(rect) => self.add_scissor(*rect),
            DrawCmd::ClipRRect(rrect) => self.add_scissor(rrect.outer_rect()),
            DrawCmd::ClipPath(path) => self.add_scissor(path.bounds()),
            DrawCmd::DrawPath { .. }
            | DrawCmd::DrawImage { .. }
            | DrawCmd::DrawImageRect { .. }
            | DrawCmd::DrawImageNine { .. }
            | DrawCmd::DrawPicture(_)
            | DrawCmd::DrawTextBlob { .. } => {
                if let Some(bounds) = cmd.bounds() {
                    let mapped = self.state().xform.map_rect(&bounds);
                    self.add_paint_bounds(mapped);
                }
            }
        }

        self.draw_cmds.push(cmd);
    }

    fn restore(&mut self) {
        if self.states.len() <= 1 {
            // Recorded as is; replaying the picture reports the mismatch
            tracing::warn!("PictureRecorder: restore without matching save");
            return;
        }

        let Some(popped) = self.states.pop() else {
            return;
        };
        if popped.save_layer {
            let bounds = popped.paint_bounds.shift(popped.layer_offset);
            let mapped = self.state().xform.map_rect(&bounds);
            self.add_paint_bounds(mapped);
        } else {
            self.state_mut().paint_bounds = popped.paint_bounds;
        }
    }

    fn add_scissor(&mut self, local: Rect) {
        let state = self.state_mut();
        let rect = state.xform.map_rect(&local);
        state.scissor = Some(match state.scissor {
            Some(scissor) => scissor.intersect(&rect),
            None => rect,
        });
    }

    fn add_paint_bounds(&mut self, bounds: Rect) {
        let state = self.state_mut();
        let bounds = match state.scissor {
            Some(scissor) => bounds.intersect(&scissor),
            None => bounds,
        };
        if bounds.is_empty() {
            return;
        }

        state.paint_bounds = if state.paint_bounds.is_empty() {
            bounds
        } else {
            state.paint_bounds.expand_to_include(&bounds)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::paint::Paint;
    use crate::path::Path;
    use verso_core::Color;

    fn rect_cmd(rect: Rect) -> DrawCmd {
        let mut path = Path::new();
        path.add_rect(rect);
        DrawCmd::DrawPath {
            path,
            paint: Paint::fill(Color::RED),
        }
    }

    #[test]
    fn test_paint_bounds_follow_transform() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::Translate { dx: 10.0, dy: 20.0 });
        recorder.add_draw_cmd(rect_cmd(Rect::from_ltwh(0.0, 0.0, 5.0, 5.0)));

        let picture = recorder.end_recording().unwrap();
        assert_eq!(picture.paint_bounds(), Rect::from_ltwh(10.0, 20.0, 5.0, 5.0));
        assert_eq!(picture.draw_cmds().len(), 2);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_scissor_limits_bounds() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::Save);
        recorder.add_draw_cmd(DrawCmd::ClipRect(Rect::from_ltwh(0.0, 0.0, 4.0, 4.0)));
        recorder.add_draw_cmd(rect_cmd(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0)));
        recorder.add_draw_cmd(DrawCmd::Restore);

        let picture = recorder.end_recording().unwrap();
        assert_eq!(picture.paint_bounds(), Rect::from_ltwh(0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn test_save_layer_bounds_are_offset() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::SaveLayer {
            rect: Rect::from_ltwh(100.0, 100.0, 50.0, 50.0),
            paint: Paint::default(),
        });
        recorder.add_draw_cmd(rect_cmd(Rect::from_ltwh(0.0, 0.0, 10.0, 10.0)));
        recorder.add_draw_cmd(DrawCmd::Restore);

        let picture = recorder.end_recording().unwrap();
        assert_eq!(picture.paint_bounds(), Rect::from_ltwh(100.0, 100.0, 10.0, 10.0));
    }

    #[test]
    fn test_unbalanced_save_fails() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::Save);
        assert_eq!(
            recorder.end_recording().unwrap_err(),
            PaintError::UnmatchedSaveRestore
        );
    }

    #[test]
    fn test_extra_restore_is_recorded() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::Restore);
        assert_eq!(recorder.save_count(), 1);
        let picture = recorder.end_recording().unwrap();
        assert_eq!(picture.draw_cmds().len(), 1);
    }

    #[test]
    fn test_dynamic_propagates() {
        let mut recorder = PictureRecorder::new();
        recorder.add_draw_cmd(DrawCmd::DrawImage {
            image: Image::dynamic(4, 4),
            offset: Point::ZERO,
            paint: Paint::default(),
        });
        let inner = recorder.end_recording().unwrap();
        assert!(inner.is_dynamic());

        recorder.add_draw_cmd(DrawCmd::DrawPicture(inner));
        let outer = recorder.end_recording().unwrap();
        assert!(outer.is_dynamic());
    }
}
