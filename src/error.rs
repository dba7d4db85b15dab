//! Error types for background removal service operations

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error taxonomy shared by the image operations and the HTTP layer
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// A required request field is absent
    #[error("{0}")]
    InputMissing(String),

    /// Malformed color, invalid grid, corrupt image or payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No segmentation backend was selected at startup
    #[error("No background removal method available")]
    ServiceUnavailable,

    /// Unexpected failure inside an image operation
    #[error("Processing error: {0}")]
    Processing(String),

    /// Model loading or inference errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (socket bind, model file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BgRemovalError {
    /// Create a new missing-input error
    pub fn input_missing<S: Into<String>>(msg: S) -> Self {
        Self::InputMissing(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an error for image bytes that could not be decoded
    pub fn image_decode_error(error: &image::ImageError) -> Self {
        Self::InvalidInput(format!(
            "Failed to decode image: {}. Supported formats: PNG, JPEG, WebP, TIFF",
            error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether the error was caused by the request rather than the service
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InputMissing(_) | Self::InvalidInput(_))
    }
}
