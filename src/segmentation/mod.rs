//! Segmentation backends and startup backend selection
//!
//! Two strategies implement [`Segmenter`]:
//! - an ONNX salient-object model run through Tract (`tract` feature)
//! - an iterative graph-cut classifier (`classical` feature)
//!
//! [`select_backend`] tries them once, in that order, and returns an
//! immutable [`SegmentationBackend`] shared by every request.

#[cfg(feature = "classical")]
pub mod classical;
#[cfg(feature = "classical")]
pub mod gmm;
#[cfg(feature = "classical")]
pub mod grabcut;
#[cfg(feature = "classical")]
pub mod maxflow;
#[cfg(feature = "classical")]
pub mod refine;

#[cfg(feature = "tract")]
pub mod tract;

use crate::{
    config::SegmentationConfig,
    error::{BgRemovalError, Result},
    types::SegmentationMethod,
};
use image::{GrayImage, Rgba, RgbImage, RgbaImage};
use tracing::{info, warn};

#[cfg(feature = "classical")]
pub use classical::{ClassicalSegmenter, MaskOutcome};
#[cfg(feature = "tract")]
pub use self::tract::TractSegmenter;

/// A background removal strategy
pub trait Segmenter: Send + Sync {
    /// Which method this strategy reports to clients
    fn method(&self) -> SegmentationMethod;

    /// Return `image` as RGBA with background pixels made transparent
    ///
    /// # Errors
    /// - Model inference failures
    /// - Internal processing errors
    fn segment(&self, image: &RgbImage) -> Result<RgbaImage>;
}

/// The backend chosen at startup, or none
pub struct SegmentationBackend {
    inner: Option<Box<dyn Segmenter>>,
}

impl SegmentationBackend {
    #[must_use]
    pub fn new(segmenter: Box<dyn Segmenter>) -> Self {
        Self {
            inner: Some(segmenter),
        }
    }

    /// A backend that fails every request with `ServiceUnavailable`
    #[must_use]
    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    #[must_use]
    pub fn method(&self) -> SegmentationMethod {
        self.inner
            .as_ref()
            .map_or(SegmentationMethod::None, |segmenter| segmenter.method())
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Remove the background of `image`
    ///
    /// # Errors
    /// Returns `ServiceUnavailable` when no backend was selected, otherwise
    /// whatever the selected strategy reports.
    pub fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let segmenter = self.inner.as_ref().ok_or(BgRemovalError::ServiceUnavailable)?;
        segmenter.segment(image)
    }
}

impl std::fmt::Debug for SegmentationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationBackend")
            .field("method", &self.method())
            .finish()
    }
}

/// Factory trait for creating segmentation strategies
pub trait BackendFactory {
    /// Create the strategy for `method`
    ///
    /// # Errors
    /// Returns an error when the capability is missing or fails to load.
    fn create_backend(&self, method: SegmentationMethod) -> Result<Box<dyn Segmenter>>;

    /// Methods this factory can attempt, in preference order
    fn available_backends(&self) -> Vec<SegmentationMethod>;
}

/// Factory backed by the compiled-in strategies and the service configuration
#[derive(Debug, Clone)]
pub struct DefaultBackendFactory {
    config: SegmentationConfig,
}

impl DefaultBackendFactory {
    #[must_use]
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, method: SegmentationMethod) -> Result<Box<dyn Segmenter>> {
        match method {
            #[cfg(feature = "tract")]
            SegmentationMethod::Ai => {
                let path = self.config.model.path.as_ref().ok_or_else(|| {
                    BgRemovalError::model("No segmentation model configured")
                })?;
                let segmenter = TractSegmenter::load(path, &self.config.model)?;
                Ok(Box::new(segmenter))
            },
            #[cfg(feature = "classical")]
            SegmentationMethod::Classical => {
                if !self.config.classical.enabled {
                    return Err(BgRemovalError::invalid_config(
                        "Classical segmentation disabled by configuration",
                    ));
                }
                Ok(Box::new(ClassicalSegmenter::new(self.config.classical.clone())))
            },
            other => Err(BgRemovalError::invalid_config(format!(
                "Segmentation method '{}' is not compiled into this build",
                other
            ))),
        }
    }

    fn available_backends(&self) -> Vec<SegmentationMethod> {
        let mut methods = Vec::new();
        #[cfg(feature = "tract")]
        methods.push(SegmentationMethod::Ai);
        #[cfg(feature = "classical")]
        methods.push(SegmentationMethod::Classical);
        methods
    }
}

/// Try the factory's strategies in preference order and keep the first that loads
#[must_use]
pub fn select_backend(factory: &dyn BackendFactory) -> SegmentationBackend {
    for method in factory.available_backends() {
        match factory.create_backend(method) {
            Ok(segmenter) => {
                info!(
                    method = %segmenter.method(),
                    quality = segmenter.method().quality(),
                    "Selected background removal backend"
                );
                return SegmentationBackend::new(segmenter);
            },
            Err(e) => {
                warn!(method = %method, error = %e, "Background removal backend not available");
            },
        }
    }

    warn!("No background removal method available; /remove-background will fail");
    SegmentationBackend::unavailable()
}

/// Merge RGB pixels with an alpha mask, zeroing fully transparent pixels
pub(crate) fn apply_alpha_mask(image: &RgbImage, mask: &GrayImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        let alpha = mask.get_pixel(x, y)[0];
        if alpha == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            let [r, g, b] = image.get_pixel(x, y).0;
            Rgba([r, g, b, alpha])
        }
    })
}

/// Convert to RGBA with every pixel fully opaque
pub(crate) fn opaque_rgba(image: &RgbImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Segmenter that keeps the left half of the image
    #[derive(Debug)]
    pub(crate) struct HalfMaskSegmenter;

    impl Segmenter for HalfMaskSegmenter {
        fn method(&self) -> SegmentationMethod {
            SegmentationMethod::Ai
        }

        fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
            let (width, height) = image.dimensions();
            let mask = GrayImage::from_fn(width, height, |x, _| {
                image::Luma([if x < width / 2 { 255 } else { 0 }])
            });
            Ok(apply_alpha_mask(image, &mask))
        }
    }

    /// Factory whose strategies succeed or fail as configured
    pub(crate) struct ScriptedFactory {
        pub(crate) ai_loads: bool,
        pub(crate) classical_loads: bool,
    }

    impl BackendFactory for ScriptedFactory {
        fn create_backend(&self, method: SegmentationMethod) -> Result<Box<dyn Segmenter>> {
            match method {
                SegmentationMethod::Ai if self.ai_loads => Ok(Box::new(HalfMaskSegmenter)),
                SegmentationMethod::Classical if self.classical_loads => {
                    Ok(Box::new(ClassicalStub))
                },
                _ => Err(BgRemovalError::model("not installed")),
            }
        }

        fn available_backends(&self) -> Vec<SegmentationMethod> {
            vec![SegmentationMethod::Ai, SegmentationMethod::Classical]
        }
    }

    #[derive(Debug)]
    pub(crate) struct ClassicalStub;

    impl Segmenter for ClassicalStub {
        fn method(&self) -> SegmentationMethod {
            SegmentationMethod::Classical
        }

        fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
            Ok(opaque_rgba(image))
        }
    }
}
