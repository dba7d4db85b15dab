//! Tract backend for salient-object segmentation models
//!
//! Loads a U²-Net style ONNX model with pure Rust inference. The model takes a
//! square NCHW image and returns a saliency map whose first channel becomes
//! the alpha mask after min-max normalization.

use super::{apply_alpha_mask, Segmenter};
use crate::{
    config::ModelConfig,
    error::{BgRemovalError, Result},
    types::SegmentationMethod,
};
use image::{imageops::FilterType, GrayImage, RgbImage, RgbaImage};
use instant::Instant;
use ndarray::Array4;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{debug, info};

/// Type alias for the optimized Tract model type
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Segmenter running an ONNX model through Tract
#[derive(Debug)]
pub struct TractSegmenter {
    model: TractModel,
    config: ModelConfig,
}

impl TractSegmenter {
    /// Load and optimize the model at `path`
    ///
    /// # Errors
    /// - Missing or unreadable model file
    /// - Model graph Tract cannot type or optimize for the configured input size
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self> {
        let start = Instant::now();
        if !path.is_file() {
            return Err(BgRemovalError::model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let size = config.input_size as usize;
        let model = onnx()
            .model_for_path(path)
            .map_err(|e| BgRemovalError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| BgRemovalError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| BgRemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                BgRemovalError::model(format!("Failed to create runnable model: {e}"))
            })?;

        info!(
            model = %path.display(),
            input_size = config.input_size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tract model loaded"
        );

        Ok(Self {
            model,
            config: config.clone(),
        })
    }

    fn infer(&self, input: Array4<f32>) -> Result<GrayImage> {
        let start = Instant::now();
        let outputs = self
            .model
            .run(tvec![Tensor::from(input).into()])
            .map_err(|e| BgRemovalError::model(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BgRemovalError::model("No output tensor found"))?;
        let view = output.to_array_view::<f32>().map_err(|e| {
            BgRemovalError::model(format!("Failed to convert output tensor: {e}"))
        })?;

        let shape = view.shape();
        let (height, width) = match *shape {
            [_, _, h, w] | [_, h, w] => (h, w),
            _ => {
                return Err(BgRemovalError::model(format!(
                    "Unexpected output tensor shape {shape:?}"
                )))
            },
        };
        // first channel of the first batch item
        let plane: Vec<f32> = view.iter().take(height * width).copied().collect();

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            ?shape,
            "Tract inference completed"
        );
        saliency_to_mask(&plane, width as u32, height as u32)
    }
}

impl Segmenter for TractSegmenter {
    fn method(&self) -> SegmentationMethod {
        SegmentationMethod::Ai
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let input = to_input_tensor(image, &self.config);
        let mask = self.infer(input)?;
        let mask = image::imageops::resize(&mask, width, height, FilterType::Lanczos3);
        Ok(apply_alpha_mask(image, &mask))
    }
}

/// Resize to the model input and normalize into an NCHW tensor
///
/// Pixel values are scaled by the brightest channel value before the
/// per-channel mean and standard deviation are applied.
pub(crate) fn to_input_tensor(image: &RgbImage, config: &ModelConfig) -> Array4<f32> {
    let size = config.input_size;
    let resized = image::imageops::resize(image, size, size, FilterType::Lanczos3);
    let peak = resized
        .as_raw()
        .iter()
        .copied()
        .max()
        .map_or(1e-6, |max| f32::from(max).max(1e-6));

    let size = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            let value = f32::from(pixel[channel]) / peak;
            tensor[[0, channel, y as usize, x as usize]] = (value
                - config.normalization_mean[channel])
                / config.normalization_std[channel];
        }
    }
    tensor
}

/// Min-max normalize a saliency plane into an 8-bit mask
pub(crate) fn saliency_to_mask(plane: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    let expected = width as usize * height as usize;
    if plane.len() != expected {
        return Err(BgRemovalError::processing(format!(
            "Saliency map has {} values, expected {}",
            plane.len(),
            expected
        )));
    }

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let pixels = plane
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                (((v - min) / range) * 255.0) as u8
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(width, height, pixels)
        .ok_or_else(|| BgRemovalError::processing("Failed to build mask from saliency map"))
}
