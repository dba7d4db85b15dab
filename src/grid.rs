//! Passport photo sheet layout

use crate::{
    compositor::flatten_rgba,
    config::GridLimits,
    error::{BgRemovalError, Result},
    types::{Color, GridSpec},
};
use image::{
    imageops::{self, FilterType},
    DynamicImage, RgbImage,
};
use tracing::debug;

/// Tile `photo` into the grid described by `spec` on a white canvas
///
/// Transparency is flattened onto white first, then the photo is resized to
/// the cell size with a Lanczos filter. Resizing straight alpha would bleed
/// the colour of transparent pixels into the subject's edge.
///
/// # Errors
/// Returns `InvalidInput` for non-positive dimensions or a canvas larger
/// than `limits` allow. Validation happens before any allocation.
pub fn tile(photo: &DynamicImage, spec: &GridSpec, limits: &GridLimits) -> Result<RgbImage> {
    spec.validate()?;

    let (canvas_width, canvas_height) = spec
        .canvas_dimensions()
        .ok_or_else(|| BgRemovalError::invalid_input("Grid dimensions are too large"))?;

    let canvas_pixels = u64::from(canvas_width) * u64::from(canvas_height);
    if canvas_pixels > limits.max_canvas_pixels {
        return Err(BgRemovalError::invalid_input(format!(
            "Grid canvas {}x{} exceeds the limit of {} pixels",
            canvas_width, canvas_height, limits.max_canvas_pixels
        )));
    }

    debug!(
        rows = spec.rows,
        cols = spec.cols,
        canvas_width,
        canvas_height,
        "Laying out passport grid"
    );

    let opaque = if photo.color().has_alpha() {
        flatten_rgba(&photo.to_rgba8(), Color::WHITE)
    } else {
        photo.to_rgb8()
    };
    let cell = imageops::resize(&opaque, spec.cell_width, spec.cell_height, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(canvas_width, canvas_height, Color::WHITE.to_rgb());
    for row in 0..spec.rows {
        for col in 0..spec.cols {
            let (x, y) = spec.cell_origin(row, col);
            imageops::replace(&mut canvas, &cell, i64::from(x), i64::from(y));
        }
    }

    Ok(canvas)
}
