//! Renderer configuration
//!
//! Defaults suit a 1x display; every field can be overridden in code, and a
//! few can be overridden at startup through the environment:
//!
//! - `VERSO_DEVICE_PIXEL_RATIO=2.0`
//! - `VERSO_TESS_TTL_FRAMES=5`
//! - `VERSO_GRADIENT_CACHE=32`
//! - `VERSO_MSAA_SAMPLES=4`

use crate::error::{RenderError, Result};

/// Kernel uniforms hold at most 25 taps, i.e. a radius of 12 = 3 × 4.0
const MAX_SUPPORTED_BLUR_SIGMA: f32 = 4.0;

/// Configuration for a [`PictureFlusher`](crate::PictureFlusher)
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Physical pixels per logical pixel
    pub device_pixel_ratio: f32,
    /// Frames a flattened Bézier may stay unused before it is evicted
    pub tessellation_ttl_frames: u64,
    /// Number of gradient textures kept alive
    pub gradient_cache_capacity: usize,
    /// Width in texels of each gradient texture
    pub gradient_resolution: u32,
    /// Largest sigma blurred at full resolution; larger sigmas downscale
    pub max_blur_sigma: f32,
    /// Upper bound for the blur downscale factor
    pub max_texture_size: u32,
    /// Device-space stroke widths are clamped to this
    pub max_stroke_width: f32,
    /// MSAA sample count for offscreen layers (0 = off)
    pub msaa_samples: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            tessellation_ttl_frames: 5,
            gradient_cache_capacity: 32,
            gradient_resolution: 256,
            max_blur_sigma: 4.0,
            max_texture_size: 16384,
            max_stroke_width: 200.0,
            msaa_samples: 0,
        }
    }
}

impl RendererConfig {
    /// Defaults overlaid with the `VERSO_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are ignored
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |name: &str| lookup(name).map(|v| v.trim().to_string());

        if let Some(v) = parse("VERSO_DEVICE_PIXEL_RATIO").and_then(|v| v.parse::<f32>().ok()) {
            self.device_pixel_ratio = v;
        }
        if let Some(v) = parse("VERSO_TESS_TTL_FRAMES").and_then(|v| v.parse::<u64>().ok()) {
            self.tessellation_ttl_frames = v;
        }
        if let Some(v) = parse("VERSO_GRADIENT_CACHE").and_then(|v| v.parse::<usize>().ok()) {
            self.gradient_cache_capacity = v;
        }
        if let Some(v) = parse("VERSO_MSAA_SAMPLES").and_then(|v| v.parse::<u32>().ok()) {
            self.msaa_samples = v;
        }
        self
    }

    pub fn with_device_pixel_ratio(mut self, device_pixel_ratio: f32) -> Self {
        self.device_pixel_ratio = device_pixel_ratio;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.device_pixel_ratio > 0.0) || !self.device_pixel_ratio.is_finite() {
            return Err(RenderError::InvalidConfig(format!(
                "device_pixel_ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        if self.gradient_cache_capacity == 0 {
            return Err(RenderError::InvalidConfig(
                "gradient_cache_capacity must be at least 1".into(),
            ));
        }
        if self.gradient_resolution < 2 {
            return Err(RenderError::InvalidConfig(format!(
                "gradient_resolution must be at least 2, got {}",
                self.gradient_resolution
            )));
        }
        if !(self.max_blur_sigma > 0.0) || self.max_blur_sigma > MAX_SUPPORTED_BLUR_SIGMA {
            return Err(RenderError::InvalidConfig(format!(
                "max_blur_sigma must be in (0, {}], got {}",
                MAX_SUPPORTED_BLUR_SIGMA, self.max_blur_sigma
            )));
        }
        if self.max_texture_size == 0 {
            return Err(RenderError::InvalidConfig(
                "max_texture_size must be at least 1".into(),
            ));
        }
        if !(self.max_stroke_width > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "max_stroke_width must be positive, got {}",
                self.max_stroke_width
            )));
        }
        Ok(())
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            "renderer config: device_pixel_ratio={}, tess_ttl_frames={}, gradient_cache={}, gradient_resolution={}, max_blur_sigma={}, msaa_samples={}",
            self.device_pixel_ratio,
            self.tessellation_ttl_frames,
            self.gradient_cache_capacity,
            self.gradient_resolution,
            self.max_blur_sigma,
            self.msaa_samples
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tessellation_ttl_frames, 5);
        assert_eq!(config.gradient_cache_capacity, 32);
        assert_eq!(config.gradient_resolution, 256);
        assert_eq!(config.max_texture_size, 16384);
    }

    #[test]
    fn test_overlay_parses_known_keys() {
        let config = RendererConfig::default().overlay(|name| match name {
            "VERSO_DEVICE_PIXEL_RATIO" => Some(" 2.5 ".into()),
            "VERSO_GRADIENT_CACHE" => Some("8".into()),
            "VERSO_MSAA_SAMPLES" => Some("four".into()),
            _ => None,
        });
        assert_eq!(config.device_pixel_ratio, 2.5);
        assert_eq!(config.gradient_cache_capacity, 8);
        assert_eq!(config.msaa_samples, 0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RendererConfig::default().with_device_pixel_ratio(0.0);
        assert!(matches!(
            config.validate(),
            Err(RenderError::InvalidConfig(_))
        ));

        let config = RendererConfig {
            gradient_cache_capacity: 0,
            ..RendererConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RendererConfig {
            max_blur_sigma: 8.0,
            ..RendererConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
