//! Configuration types for the background removal service

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// AI segmentation model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// ONNX model file; the AI backend is unavailable when unset
    pub path: Option<PathBuf>,

    /// Square input resolution expected by the model
    pub input_size: u32,

    /// Per-channel normalization mean (RGB, 0-1 range)
    pub normalization_mean: [f32; 3],

    /// Per-channel normalization standard deviation (RGB)
    pub normalization_std: [f32; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_size: 320,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Classical (graph-cut) segmentation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalConfig {
    /// Allow the classical backend to be selected
    pub enabled: bool,

    /// Inset of the initial foreground rectangle from every border, in pixels
    pub rect_margin: u32,

    /// Number of refinement rounds
    pub iterations: u32,

    /// Longest side of the working copy the classifier runs on (None = full size)
    pub working_size: Option<u32>,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rect_margin: 10,
            iterations: 5,
            working_size: Some(800),
        }
    }
}

/// Backend selection inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub model: ModelConfig,
    pub classical: ClassicalConfig,
}

/// Bounds applied to passport grid requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    /// Largest canvas (width * height) a request may allocate
    pub max_canvas_pixels: u64,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_canvas_pixels: 64 * 1024 * 1024,
        }
    }
}

/// Configuration for the HTTP service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Segmentation backend configuration
    pub segmentation: SegmentationConfig,

    /// Passport grid limits
    pub grid: GridLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
            request_timeout_secs: 120,
            segmentation: SegmentationConfig::default(),
            grid: GridLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Socket address string `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    /// - Empty host
    /// - Zero timeout, upload limit or model input size
    /// - Classical iterations outside 1-100
    /// - Non-positive normalization std
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BgRemovalError::invalid_config("Host must not be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(BgRemovalError::config_value_error(
                "request timeout",
                self.request_timeout_secs,
                "1+ seconds",
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(BgRemovalError::config_value_error(
                "upload limit",
                self.max_upload_bytes,
                "1+ bytes",
            ));
        }

        let model = &self.segmentation.model;
        if model.input_size == 0 {
            return Err(BgRemovalError::config_value_error(
                "model input size",
                model.input_size,
                "1+ pixels",
            ));
        }
        if model.normalization_std.iter().any(|s| *s <= 0.0) {
            return Err(BgRemovalError::invalid_config(
                "Normalization std values must be positive",
            ));
        }

        let classical = &self.segmentation.classical;
        if !(1..=100).contains(&classical.iterations) {
            return Err(BgRemovalError::config_value_error(
                "iterations",
                classical.iterations,
                "1-100",
            ));
        }
        if classical.working_size == Some(0) {
            return Err(BgRemovalError::config_value_error(
                "working size",
                0,
                "1+ pixels",
            ));
        }

        if self.grid.max_canvas_pixels == 0 {
            return Err(BgRemovalError::config_value_error(
                "max canvas pixels",
                self.grid.max_canvas_pixels,
                "1+",
            ));
        }

        Ok(())
    }
}

/// Builder for `ServerConfig`
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.config.segmentation.model.path = path.map(Into::into);
        self
    }

    #[must_use]
    pub fn model_input_size(mut self, size: u32) -> Self {
        self.config.segmentation.model.input_size = size;
        self
    }

    #[must_use]
    pub fn classical_enabled(mut self, enabled: bool) -> Self {
        self.config.segmentation.classical.enabled = enabled;
        self
    }

    #[must_use]
    pub fn rect_margin(mut self, margin: u32) -> Self {
        self.config.segmentation.classical.rect_margin = margin;
        self
    }

    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.segmentation.classical.iterations = iterations;
        self
    }

    #[must_use]
    pub fn working_size(mut self, size: Option<u32>) -> Self {
        self.config.segmentation.classical.working_size = size;
        self
    }

    #[must_use]
    pub fn max_canvas_pixels(mut self, pixels: u64) -> Self {
        self.config.grid.max_canvas_pixels = pixels;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `InvalidConfig` if validation fails.
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
