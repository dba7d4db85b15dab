//! Background removal server CLI
//!
//! Parses flags (with environment fallbacks), installs the tracing
//! subscriber, selects the segmentation backend and serves HTTP.

use super::config::CliConfigBuilder;
use crate::{
    segmentation::{select_backend, DefaultBackendFactory},
    server,
    tracing_config::{init_server_tracing, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

/// HTTP service for background removal and passport photo sheets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-server")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "BGREMOVE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// ONNX salient-object model; without it the graph-cut backend is used
    #[arg(short, long, env = "BGREMOVE_MODEL", value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Square input size the model expects
    #[arg(long, env = "BGREMOVE_MODEL_INPUT_SIZE", default_value_t = 320)]
    pub model_input_size: u32,

    /// Never fall back to graph-cut segmentation
    #[arg(long, env = "BGREMOVE_NO_CLASSICAL")]
    pub no_classical: bool,

    /// Inset of the graph-cut seed rectangle in pixels
    #[arg(long, env = "BGREMOVE_RECT_MARGIN", default_value_t = 10)]
    pub rect_margin: u32,

    /// Graph-cut refinement rounds
    #[arg(long, env = "BGREMOVE_ITERATIONS", default_value_t = 5)]
    pub iterations: u32,

    /// Longest side for graph-cut classification (0 = full resolution)
    #[arg(long, env = "BGREMOVE_WORKING_SIZE", default_value_t = 800)]
    pub working_size: u32,

    /// Largest accepted request body in MiB
    #[arg(long, env = "BGREMOVE_MAX_UPLOAD_MB", default_value_t = 16)]
    pub max_upload_mb: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "BGREMOVE_TIMEOUT", default_value_t = 120)]
    pub timeout: u64,

    /// Largest passport sheet (width * height) a request may produce
    #[arg(long, env = "BGREMOVE_MAX_CANVAS_PIXELS", default_value_t = 64 * 1024 * 1024)]
    pub max_canvas_pixels: u64,

    /// Log output format
    #[arg(long, value_enum, env = "BGREMOVE_LOG_FORMAT", default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output formats selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_server_tracing(cli.verbose, cli.log_format.into())
        .context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli).context("Invalid configuration")?;
    debug!(?config, "Configuration loaded");

    let backend = select_backend(&DefaultBackendFactory::new(config.segmentation.clone()));
    info!(
        method = %backend.method(),
        quality = backend.method().quality(),
        "Background removal method selected"
    );

    server::serve(config, backend)
        .await
        .context("Server terminated with an error")
}
