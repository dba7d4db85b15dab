//! Classical (non-learned) background removal
//!
//! Runs a rectangle-seeded graph cut, softens the resulting mask and attaches
//! it as alpha. When the cut cannot run at all the image is returned fully
//! opaque rather than failing the request.

use super::{
    apply_alpha_mask,
    grabcut::{grab_cut, GrabCutError},
    opaque_rgba, refine, Segmenter,
};
use crate::{config::ClassicalConfig, error::Result, types::SegmentationMethod};
use image::{imageops::FilterType, GrayImage, Luma, RgbImage, RgbaImage};
use instant::Instant;
use tracing::{debug, warn};

/// Result of classifying an image
#[derive(Debug, Clone)]
pub enum MaskOutcome {
    /// Soft alpha mask at the input's dimensions
    Refined(GrayImage),
    /// Segmentation could not run; callers keep the whole image
    Degraded { reason: GrabCutError },
}

/// Graph-cut segmenter
#[derive(Debug, Clone)]
pub struct ClassicalSegmenter {
    config: ClassicalConfig,
}

impl ClassicalSegmenter {
    #[must_use]
    pub fn new(config: ClassicalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClassicalConfig {
        &self.config
    }

    /// Compute the alpha mask for `image`
    ///
    /// Large inputs are segmented at the configured working size and the mask
    /// is scaled back up before refinement.
    #[must_use]
    pub fn classify(&self, image: &RgbImage) -> MaskOutcome {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        let longest = width.max(height);

        let binary = match self.config.working_size {
            Some(limit) if limit > 0 && longest > limit => {
                let scale = f64::from(limit) / f64::from(longest);
                let small_w = ((f64::from(width) * scale).round() as u32).max(1);
                let small_h = ((f64::from(height) * scale).round() as u32).max(1);
                let mut margin = (f64::from(self.config.rect_margin) * scale).round() as u32;
                if self.config.rect_margin > 0 {
                    margin = margin.max(1);
                }

                debug!(
                    from = %format!("{}x{}", width, height),
                    to = %format!("{}x{}", small_w, small_h),
                    margin,
                    "Downscaling for graph cut"
                );
                let small = image::imageops::resize(image, small_w, small_h, FilterType::Triangle);
                grab_cut(&small, margin, self.config.iterations)
                    .map(|mask| upscale_mask(&mask, width, height))
            },
            _ => grab_cut(image, self.config.rect_margin, self.config.iterations),
        };

        match binary {
            Ok(mask) => {
                let alpha = refine::smooth(&refine::refine_mask(&mask));
                debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Graph cut segmentation completed"
                );
                MaskOutcome::Refined(alpha)
            },
            Err(reason) => MaskOutcome::Degraded { reason },
        }
    }
}

/// Resize a binary mask and re-threshold it
fn upscale_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    let mut resized = image::imageops::resize(mask, width, height, FilterType::Triangle);
    for pixel in resized.pixels_mut() {
        *pixel = Luma([if pixel[0] >= 128 { 255 } else { 0 }]);
    }
    resized
}

impl Segmenter for ClassicalSegmenter {
    fn method(&self) -> SegmentationMethod {
        SegmentationMethod::Classical
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        match self.classify(image) {
            MaskOutcome::Refined(alpha) => Ok(apply_alpha_mask(image, &alpha)),
            MaskOutcome::Degraded { reason } => {
                warn!(error = %reason, "Graph cut failed, returning image unmodified");
                Ok(opaque_rgba(image))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn portrait(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let inside = x > width / 4 && x < 3 * width / 4 && y > height / 4 && y < 3 * height / 4;
            if inside {
                Rgb([40, 60, 160])
            } else {
                Rgb([250, 250, 250])
            }
        })
    }

    #[test]
    fn test_narrow_image_stays_opaque() {
        let segmenter = ClassicalSegmenter::new(ClassicalConfig::default());
        let image = RgbImage::from_pixel(2, 40, Rgb([90, 80, 70]));

        assert!(matches!(
            segmenter.classify(&image),
            MaskOutcome::Degraded {
                reason: GrabCutError::InvalidRect { .. }
            }
        ));

        let rgba = segmenter.segment(&image).unwrap();
        assert_eq!(rgba.dimensions(), (2, 40));
        assert!(rgba.pixels().all(|p| p.0 == [90, 80, 70, 255]));
    }

    #[test]
    fn test_subject_kept_and_border_removed() {
        let segmenter = ClassicalSegmenter::new(ClassicalConfig::default());
        let image = portrait(60, 80);
        let rgba = segmenter.segment(&image).unwrap();

        assert_eq!(rgba.dimensions(), (60, 80));
        let center = rgba.get_pixel(30, 40).0;
        assert_eq!(center[..3], [40, 60, 160]);
        assert!(center[3] >= 254);
        assert_eq!(rgba.get_pixel(2, 2)[3], 0);
    }

    #[test]
    fn test_downscaled_mask_matches_input_size() {
        let config = ClassicalConfig {
            working_size: Some(50),
            ..ClassicalConfig::default()
        };
        let segmenter = ClassicalSegmenter::new(config);
        let image = portrait(100, 120);

        let MaskOutcome::Refined(alpha) = segmenter.classify(&image) else {
            panic!("expected a refined mask");
        };
        assert_eq!(alpha.dimensions(), (100, 120));
        assert!(alpha.get_pixel(50, 60)[0] >= 254);
        assert_eq!(alpha.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_upscale_mask_is_binary() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([255]));
        mask.put_pixel(2, 2, Luma([255]));
        let up = upscale_mask(&mask, 16, 16);
        assert_eq!(up.dimensions(), (16, 16));
        assert!(up.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
