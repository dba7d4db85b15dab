//! Alpha compositing onto solid backgrounds

use crate::types::Color;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

/// Blend one 8-bit channel of `fg` over `bg` with coverage `alpha`
#[inline]
fn blend_channel(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let mixed = u32::from(fg) * a + u32::from(bg) * (255 - a);
    // rounded division by 255, result is always <= 255
    ((mixed + 127) / 255) as u8
}

/// Composite an RGBA image over an opaque `background` and drop the alpha channel
#[must_use]
pub fn flatten_rgba(image: &RgbaImage, background: Color) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut result = RgbImage::new(width, height);

    for (src, dst) in image.pixels().zip(result.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = Rgb([
            blend_channel(r, background.r, a),
            blend_channel(g, background.g, a),
            blend_channel(b, background.b, a),
        ]);
    }

    result
}

/// Composite any image over `background`
///
/// Images without an alpha channel are treated as fully opaque, so the
/// result equals their RGB content.
#[must_use]
pub fn composite(image: &DynamicImage, background: Color) -> RgbImage {
    if image.color().has_alpha() {
        flatten_rgba(&image.to_rgba8(), background)
    } else {
        image.to_rgb8()
    }
}
