//! Gradient color ramps
//!
//! Each distinct (colors, stops) pair is rasterized once into a
//! `resolution × 1` RGBA8 texture; an LRU keeps the most recently used ones.

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use verso_core::Color;
use verso_paint::{Gradient, Image};

/// Rasterized gradient ramp
#[derive(Debug)]
pub struct GradientTexture {
    /// Handle the backend uploads `pixels` to
    pub image: Image,
    /// `width` RGBA8 texels
    pub pixels: Vec<u8>,
}

impl GradientTexture {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn texel(&self, index: usize) -> [u8; 4] {
        let base = index * 4;
        [
            self.pixels[base],
            self.pixels[base + 1],
            self.pixels[base + 2],
            self.pixels[base + 3],
        ]
    }
}

/// Exact bit pattern of the colors and stops
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GradientKey(Vec<u32>);

impl GradientKey {
    fn new(colors: &[Color], stops: &[f32]) -> Self {
        let mut bits = Vec::with_capacity(colors.len() * 5);
        for color in colors {
            bits.extend(color.to_array().iter().map(|c| c.to_bits()));
        }
        bits.extend(stops.iter().map(|s| s.to_bits()));
        Self(bits)
    }
}

pub struct GradientCache {
    entries: LruCache<GradientKey, Rc<GradientTexture>>,
    resolution: u32,
}

impl std::fmt::Debug for GradientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradientCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl GradientCache {
    pub fn new(capacity: usize, resolution: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            resolution: resolution.max(2),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ramp texture for `gradient`, built on first use
    pub fn get(&mut self, gradient: &Gradient) -> Rc<GradientTexture> {
        let (colors, stops) = gradient.colorizer_stops();
        self.get_for_stops(colors, stops)
    }

    pub fn get_for_stops(&mut self, colors: &[Color], stops: &[f32]) -> Rc<GradientTexture> {
        let key = GradientKey::new(colors, stops);
        if let Some(texture) = self.entries.get(&key) {
            return texture.clone();
        }

        let texture = Rc::new(self.fill_gradient(colors, stops));
        if let Some((_, evicted)) = self.entries.push(key, texture.clone()) {
            tracing::debug!(
                "gradient cache full, evicted ramp {:?}",
                evicted.image.id()
            );
        }
        texture
    }

    fn fill_gradient(&self, colors: &[Color], stops: &[f32]) -> GradientTexture {
        let resolution = self.resolution as usize;
        let mut pixels = vec![0u8; resolution * 4];

        let mut prev_index = 0usize;
        for i in 1..colors.len() {
            // Stops map to [0, resolution], with the end nudged onto the last texel
            let next_index =
                (stops[i] * resolution as f32).min((resolution - 1) as f32).max(0.0) as usize;

            if next_index > prev_index {
                let c0 = colors[i - 1];
                let c1 = colors[i];
                let step = 1.0 / (next_index - prev_index) as f32;

                let mut t = 0.0;
                for index in prev_index..=next_index {
                    let rgba = c0.lerp(&c1, t).to_rgba8();
                    pixels[index * 4..index * 4 + 4].copy_from_slice(&rgba);
                    t += step;
                }
            }
            prev_index = next_index;
        }

        GradientTexture {
            image: Image::new(self.resolution, 1),
            pixels,
        }
    }
}
