//! Canvas that records a picture and flushes it into a command buffer

use verso_core::Matrix;
use verso_paint::{Canvas, DrawCmd, RecordingCanvas};

use crate::command::CommandBuffer;
use crate::config::RendererConfig;
use crate::error::Result;
use crate::flusher::PictureFlusher;

/// Recording canvas backed by a [`PictureFlusher`]
///
/// Draw calls are recorded until [`Canvas::flush`], which turns the recorded
/// picture into directives submitted to `B`.
pub struct CommandBufferCanvas<B: CommandBuffer> {
    recording: RecordingCanvas,
    flusher: PictureFlusher,
    buffer: B,
}

impl<B: CommandBuffer> CommandBufferCanvas<B> {
    pub fn new(config: RendererConfig, width: u32, height: u32, buffer: B) -> Result<Self> {
        let recording = RecordingCanvas::new(config.device_pixel_ratio);
        let flusher = PictureFlusher::new(config, width, height)?;
        Ok(Self {
            recording,
            flusher,
            buffer,
        })
    }

    /// Flush, keeping the renderer's error type
    pub fn try_flush(&mut self) -> Result<()> {
        let picture = self.recording.end_recording()?;
        if picture.is_empty() {
            tracing::trace!("nothing recorded, flush skipped");
            return Ok(());
        }
        self.flusher.flush(&picture, &mut self.buffer)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.flusher.resize(width, height);
    }

    pub fn flusher(&self) -> &PictureFlusher {
        &self.flusher
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

impl<B: CommandBuffer> Canvas for CommandBufferCanvas<B> {
    fn record(&mut self, cmd: DrawCmd) {
        self.recording.record(cmd);
    }

    fn save_count(&self) -> usize {
        self.recording.save_count()
    }

    fn total_matrix(&self) -> Matrix {
        self.recording.total_matrix()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.recording.device_pixel_ratio()
    }

    fn flush(&mut self) -> verso_paint::Result<()> {
        Ok(self.try_flush()?)
    }

    fn reset(&mut self) {
        self.recording.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Directive;
    use verso_core::{Color, Rect};
    use verso_paint::Paint;

    #[test]
    fn test_flush_submits_to_buffer() {
        let mut canvas = CommandBufferCanvas::new(RendererConfig::default(), 64, 64, Vec::new()).unwrap();
        canvas.draw_rect(Rect::from_ltwh(4.0, 4.0, 8.0, 8.0), &Paint::fill(Color::GREEN));
        canvas.flush().unwrap();

        let draws = canvas.buffer().iter().filter_map(Directive::as_draw_mesh).count();
        assert!(draws > 0);
    }

    #[test]
    fn test_empty_recording_submits_nothing() {
        let mut canvas = CommandBufferCanvas::new(RendererConfig::default(), 64, 64, Vec::new()).unwrap();
        canvas.flush().unwrap();
        assert!(canvas.into_buffer().is_empty());
    }
}
