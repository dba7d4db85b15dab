#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Service
//!
//! An HTTP service for ID and passport photo preparation:
//!
//! - **Background removal**: an ONNX salient-object model run through Tract,
//!   or an iterative graph-cut classifier when no model is available
//! - **Background replacement**: alpha compositing onto a solid color
//! - **Passport sheets**: tiling a photo into a printable grid tagged at 300 DPI
//!
//! The segmentation strategy is chosen once at startup and shared read-only
//! by every request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_server::{
//!     segmentation::{select_backend, DefaultBackendFactory},
//!     server, ServerConfig,
//! };
//!
//! # async fn example() -> bgremove_server::Result<()> {
//! let config = ServerConfig::builder()
//!     .port(8080)
//!     .model_path(Some("models/u2net.onnx"))
//!     .build()?;
//!
//! let backend = select_backend(&DefaultBackendFactory::new(config.segmentation.clone()));
//! server::serve(config, backend).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the image operations directly
//!
//! ```rust
//! use bgremove_server::{grid, GridLimits, GridSpec};
//! use image::{DynamicImage, RgbImage};
//!
//! let photo = DynamicImage::ImageRgb8(RgbImage::new(200, 260));
//! let sheet = grid::tile(&photo, &GridSpec::default(), &GridLimits::default()).unwrap();
//! assert_eq!(sheet.dimensions(), (1752, 2224));
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): AI segmentation backend
//! - `classical` (default): graph-cut segmentation backend
//! - `cli` (default): server binary with argument parsing and log setup
//! - `tracing-json`: JSON log output
//! - `webp-support` (default): WebP input decoding

#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod grid;
pub mod segmentation;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;

pub use compositor::composite;
pub use config::{
    ClassicalConfig, GridLimits, ModelConfig, SegmentationConfig, ServerConfig,
    ServerConfigBuilder,
};
pub use error::{BgRemovalError, Result};
pub use segmentation::{
    select_backend, BackendFactory, DefaultBackendFactory, SegmentationBackend, Segmenter,
};
pub use services::ImageIOService;
pub use types::{Color, GridSpec, SegmentationMethod};

#[cfg(feature = "cli")]
pub use tracing_config::{init_server_tracing, TracingConfig, TracingFormat};
