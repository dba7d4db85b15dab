//! Soft-edge refinement of binary segmentation masks

use image::{imageops, GrayImage};
use imageproc::{
    filter::separable_filter_equal,
    morphology::{grayscale_close, grayscale_open, Mask},
};

/// Normalised 5-tap binomial kernel, the fixed 5x5 Gaussian at sigma 1.1
pub const BLUR_KERNEL: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// 3x3 smoothing kernel, centre weighted 5
const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

/// Blur a binary mask with a 5x5 Gaussian, then close and open it with a
/// 3x3 square
#[must_use]
pub fn refine_mask(mask: &GrayImage) -> GrayImage {
    let blurred = separable_filter_equal(mask, &BLUR_KERNEL);
    let square = Mask::square(1);
    let closed = grayscale_close(&blurred, &square);
    grayscale_open(&closed, &square)
}

/// Light 3x3 smoothing of an alpha channel; border pixels are left unchanged
#[must_use]
pub fn smooth(alpha: &GrayImage) -> GrayImage {
    let (width, height) = alpha.dimensions();
    if width < 3 || height < 3 {
        return alpha.clone();
    }
    let mut smoothed: GrayImage = imageops::filter3x3(alpha, &SMOOTH_KERNEL);
    for y in 0..height {
        for x in 0..width {
            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                smoothed.put_pixel(x, y, *alpha.get_pixel(x, y));
            }
        }
    }
    smoothed
}
