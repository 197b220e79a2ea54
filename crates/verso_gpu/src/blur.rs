//! Separable Gaussian blur support
//!
//! Blurs run as two 1-D convolutions. Sigmas above the configured maximum
//! are handled by shrinking the blur targets by a power of two and blurring
//! the downscaled image with a proportionally smaller sigma.

use std::rc::Rc;

use rustc_hash::FxHashMap;

/// Widest kernel the filter shader accepts
pub const MAX_KERNEL_WIDTH: usize = 25;

/// Sigma, downscale factor and kernel radius for one blur axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurScale {
    pub sigma: f32,
    pub scale_factor: u32,
    pub radius: u32,
}

/// Reduce `sigma` below `max_sigma` by repeatedly halving the target size
pub fn adjust_sigma(mut sigma: f32, max_sigma: f32, max_texture_size: u32) -> BlurScale {
    let mut scale_factor = 1u32;
    while sigma > max_sigma {
        scale_factor = scale_factor.saturating_mul(2);
        sigma *= 0.5;

        if scale_factor > max_texture_size {
            scale_factor = max_texture_size;
            sigma = max_sigma;
        }
    }

    let radius = (sigma * 3.0).ceil().max(0.0) as u32;
    BlurScale {
        sigma,
        scale_factor,
        radius,
    }
}

/// Normalized 1-D Gaussian kernels keyed by (sigma to 0.1, radius)
#[derive(Debug, Default)]
pub struct KernelCache {
    kernels: FxHashMap<(u32, u32), Rc<[f32]>>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Kernel of `2 * radius + 1` taps summing to one
    pub fn kernel(&mut self, sigma: f32, radius: u32) -> Rc<[f32]> {
        let width = 2 * radius as usize + 1;
        debug_assert!(width <= MAX_KERNEL_WIDTH, "blur kernel too wide: {}", width);

        let sigma_tenths = (sigma * 10.0).round().max(0.0) as u32;
        self.kernels
            .entry((sigma_tenths, radius))
            .or_insert_with(|| gaussian_kernel(sigma_tenths as f32 / 10.0, radius).into())
            .clone()
    }
}

fn gaussian_kernel(sigma: f32, radius: u32) -> Vec<f32> {
    let width = 2 * radius as usize + 1;
    let two_sigma_sqrd = 2.0 * sigma * sigma;

    // Zero sigma: identity convolution
    if two_sigma_sqrd.abs() < 1.0 / 4096.0 {
        let mut kernel = vec![0.0; width];
        kernel[radius as usize] = 1.0;
        return kernel;
    }

    let denom = 1.0 / two_sigma_sqrd;
    let mut kernel: Vec<f32> = (0..width)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x * denom).exp()
        })
        .collect();

    let scale = 1.0 / kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k *= scale);
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernels_sum_to_one() {
        let mut cache = KernelCache::new();
        for radius in 0..=12 {
            for sigma in [0.0, 0.3, 1.0, 2.5, 4.0] {
                let kernel = cache.kernel(sigma, radius);
                assert_eq!(kernel.len(), 2 * radius as usize + 1);
                let sum: f32 = kernel.iter().sum();
                assert!((sum - 1.0).abs() <= 1e-4, "sigma {} radius {}: {}", sigma, radius, sum);
            }
        }
    }

    #[test]
    fn test_zero_sigma_is_delta() {
        let mut cache = KernelCache::new();
        let kernel = cache.kernel(0.0, 2);
        assert_eq!(&*kernel, &[0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_kernel_is_cached_by_rounded_sigma() {
        let mut cache = KernelCache::new();
        let a = cache.kernel(1.02, 3);
        let b = cache.kernel(0.98, 3);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_adjust_sigma_downscales() {
        let small = adjust_sigma(3.0, 4.0, 16384);
        assert_eq!(small.scale_factor, 1);
        assert_eq!(small.radius, 9);

        let large = adjust_sigma(20.0, 4.0, 16384);
        assert_eq!(large.scale_factor, 8);
        assert!((large.sigma - 2.5).abs() < 1e-6);
        assert_eq!(large.radius, 8);
    }

    #[test]
    fn test_adjust_sigma_caps_scale_factor() {
        let capped = adjust_sigma(1000.0, 4.0, 4);
        assert_eq!(capped.scale_factor, 4);
        assert_eq!(capped.sigma, 4.0);
        assert_eq!(capped.radius, 12);
    }
}
