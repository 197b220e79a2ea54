//! Canvas recording API
//!
//! [`Canvas`] turns high-level drawing calls into [`DrawCmd`]s. Implementors
//! only provide [`Canvas::record`] and a few state queries; every drawing
//! method has a default implementation building the matching path or command.

use std::f32::consts::PI;

use verso_core::{Color, Matrix, Point, RRect, Rect};

use crate::draw_cmd::DrawCmd;
use crate::error::Result;
use crate::image::Image;
use crate::paint::Paint;
use crate::path::{Path, PathWinding};
use crate::picture::{Picture, PictureRecorder};
use crate::shadow;
use crate::text::TextBlob;

/// Laid-out text that knows how to paint itself
pub trait Paragraph {
    fn paint(&self, canvas: &mut dyn Canvas, offset: Point);
}

/// Recording surface for draw commands
pub trait Canvas {
    /// Append one command
    fn record(&mut self, cmd: DrawCmd);

    /// Number of saved states, starting at 1
    fn save_count(&self) -> usize;

    /// Current transform
    fn total_matrix(&self) -> Matrix;

    fn device_pixel_ratio(&self) -> f32;

    /// Submit everything recorded so far
    fn flush(&mut self) -> Result<()>;

    /// Discard everything recorded so far
    fn reset(&mut self);

    // ─────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────

    fn save(&mut self) {
        self.record(DrawCmd::Save);
    }

    /// Save and redirect drawing into an offscreen layer covering `rect`
    fn save_layer(&mut self, rect: Rect, paint: &Paint) {
        self.record(DrawCmd::SaveLayer {
            rect,
            paint: paint.clone(),
        });
    }

    fn restore(&mut self) {
        self.record(DrawCmd::Restore);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.record(DrawCmd::Translate { dx, dy });
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.record(DrawCmd::Scale { sx, sy });
    }

    fn rotate(&mut self, radians: f32, pivot: Option<Point>) {
        self.record(DrawCmd::Rotate { radians, pivot });
    }

    fn skew(&mut self, sx: f32, sy: f32) {
        self.record(DrawCmd::Skew { sx, sy });
    }

    fn concat(&mut self, matrix: &Matrix) {
        self.record(DrawCmd::Concat(*matrix));
    }

    fn reset_matrix(&mut self) {
        self.record(DrawCmd::ResetMatrix);
    }

    fn set_matrix(&mut self, matrix: &Matrix) {
        self.record(DrawCmd::SetMatrix(*matrix));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.record(DrawCmd::ClipRect(rect));
    }

    fn clip_rrect(&mut self, rrect: RRect) {
        self.record(DrawCmd::ClipRRect(rrect));
    }

    fn clip_path(&mut self, path: &Path) {
        self.record(DrawCmd::ClipPath(path.clone()));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Drawing
    // ─────────────────────────────────────────────────────────────────────

    fn draw_line(&mut self, from: Point, to: Point, paint: &Paint) {
        let mut path = Path::new();
        path.move_to(from.x, from.y);
        path.line_to(to.x, to.y);
        self.draw_path_owned(path, paint);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        if rect.size().is_empty() {
            return;
        }
        let mut path = Path::new();
        path.add_rect(rect);
        self.draw_path_owned(path, paint);
    }

    fn draw_rrect(&mut self, rrect: &RRect, paint: &Paint) {
        let mut path = Path::new();
        path.add_rrect(rrect);
        self.draw_path_owned(path, paint);
    }

    /// Ring between two rounded rects
    fn draw_drrect(&mut self, outer: &RRect, inner: &RRect, paint: &Paint) {
        let mut path = Path::new();
        path.add_rrect(outer);
        path.add_rrect(inner);
        path.winding(PathWinding::Clockwise);
        self.draw_path_owned(path, paint);
    }

    fn draw_oval(&mut self, rect: Rect, paint: &Paint) {
        let mut path = Path::new();
        path.add_oval(rect);
        self.draw_path_owned(path, paint);
    }

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        let mut path = Path::new();
        path.add_circle(center, radius);
        self.draw_path_owned(path, paint);
    }

    /// Arc inscribed in `rect`; with `use_center` the arc is closed through
    /// the centre as a pie slice
    fn draw_arc(
        &mut self,
        rect: Rect,
        start_angle: f32,
        sweep_angle: f32,
        use_center: bool,
        paint: &Paint,
    ) {
        let mut path = Path::new();
        if use_center {
            let center = rect.center();
            path.move_to(center.x, center.y);
        }

        let mut start = start_angle;
        let mut sweep = sweep_angle;
        let mut force_move_to = !use_center;
        // Full turns are split into half turns so no single arc degenerates
        while sweep <= -PI * 2.0 {
            path.arc_to(rect, start, -PI, force_move_to);
            start -= PI;
            path.arc_to(rect, start, -PI, false);
            start -= PI;
            force_move_to = false;
            sweep += PI * 2.0;
        }
        while sweep >= PI * 2.0 {
            path.arc_to(rect, start, PI, force_move_to);
            start += PI;
            path.arc_to(rect, start, PI, false);
            start += PI;
            force_move_to = false;
            sweep -= PI * 2.0;
        }
        path.arc_to(rect, start, sweep, force_move_to);
        if use_center {
            path.close();
        }

        self.draw_path_owned(path, paint);
    }

    fn draw_path(&mut self, path: &Path, paint: &Paint) {
        self.draw_path_owned(path.clone(), paint);
    }

    #[doc(hidden)]
    fn draw_path_owned(&mut self, path: Path, paint: &Paint) {
        self.record(DrawCmd::DrawPath {
            path,
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &Image, offset: Point, paint: &Paint) {
        self.record(DrawCmd::DrawImage {
            image: image.clone(),
            offset,
            paint: paint.clone(),
        });
    }

    /// Draw `src` (or the whole image) scaled into `dst`
    fn draw_image_rect(&mut self, image: &Image, src: Option<Rect>, dst: Rect, paint: &Paint) {
        self.record(DrawCmd::DrawImageRect {
            image: image.clone(),
            src,
            dst,
            paint: paint.clone(),
        });
    }

    /// Nine-patch draw: corners keep their size, `center` stretches
    fn draw_image_nine(
        &mut self,
        image: &Image,
        src: Option<Rect>,
        center: Rect,
        dst: Rect,
        paint: &Paint,
    ) {
        self.record(DrawCmd::DrawImageNine {
            image: image.clone(),
            src,
            center,
            dst,
            paint: paint.clone(),
        });
    }

    fn draw_picture(&mut self, picture: &Picture) {
        self.record(DrawCmd::DrawPicture(picture.clone()));
    }

    fn draw_text_blob(&mut self, blob: &TextBlob, offset: Point, paint: &Paint) {
        self.record(DrawCmd::DrawTextBlob {
            blob: blob.clone(),
            offset,
            paint: paint.clone(),
        });
    }

    fn draw_paragraph(&mut self, paragraph: &dyn Paragraph, offset: Point)
    where
        Self: Sized,
    {
        paragraph.paint(self, offset);
    }

    /// Material-style elevation shadow for `path`
    fn draw_shadow(&mut self, path: &Path, color: Color, elevation: f32, transparent_occluder: bool) {
        let dpr = self.device_pixel_ratio();
        shadow::draw_shadow(self, path, color, elevation, transparent_occluder, dpr);
    }
}

/// Canvas that records into a [`PictureRecorder`]
#[derive(Debug)]
pub struct RecordingCanvas {
    recorder: PictureRecorder,
    device_pixel_ratio: f32,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RecordingCanvas {
    pub fn new(device_pixel_ratio: f32) -> Self {
        Self {
            recorder: PictureRecorder::new(),
            device_pixel_ratio,
        }
    }

    pub fn recorder(&self) -> &PictureRecorder {
        &self.recorder
    }

    /// Finish recording and return the picture
    pub fn end_recording(&mut self) -> Result<Picture> {
        self.recorder.end_recording()
    }
}

impl Canvas for RecordingCanvas {
    fn record(&mut self, cmd: DrawCmd) {
        self.recorder.add_draw_cmd(cmd);
    }

    fn save_count(&self) -> usize {
        self.recorder.save_count()
    }

    fn total_matrix(&self) -> Matrix {
        self.recorder.total_matrix()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn flush(&mut self) -> Result<()> {
        // Nothing to submit; the recorded commands stay until end_recording
        Ok(())
    }

    fn reset(&mut self) {
        self.recorder.reset();
    }
}
