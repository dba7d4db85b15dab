//! Conversion of CLI arguments into the server configuration

use crate::cli::main_impl::Cli;
use crate::config::ServerConfig;
use anyhow::{Context, Result};

/// Convert CLI arguments to `ServerConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    const BYTES_PER_MIB: usize = 1024 * 1024;

    /// Build and validate the configuration from parsed arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServerConfig> {
        let max_upload_bytes = cli
            .max_upload_mb
            .checked_mul(Self::BYTES_PER_MIB)
            .context("Upload limit is too large")?;
        let working_size = (cli.working_size > 0).then_some(cli.working_size);

        ServerConfig::builder()
            .host(cli.host.clone())
            .port(cli.port)
            .max_upload_bytes(max_upload_bytes)
            .request_timeout_secs(cli.timeout)
            .model_path(cli.model.clone())
            .model_input_size(cli.model_input_size)
            .classical_enabled(!cli.no_classical)
            .rect_margin(cli.rect_margin)
            .iterations(cli.iterations)
            .working_size(working_size)
            .max_canvas_pixels(cli.max_canvas_pixels)
            .build()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bgremove-server").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_match_server_config() {
        let config = CliConfigBuilder::from_cli(&parse(&[])).unwrap();
        let defaults = ServerConfig::default();

        assert_eq!(config.host, defaults.host);
        assert_eq!(config.max_upload_bytes, defaults.max_upload_bytes);
        assert_eq!(config.request_timeout_secs, defaults.request_timeout_secs);
        assert_eq!(config.segmentation.classical, defaults.segmentation.classical);
        assert_eq!(config.grid, defaults.grid);
    }

    #[test]
    fn test_cli_config_conversion() {
        let cli = parse(&[
            "--port",
            "8080",
            "--model",
            "models/u2net.onnx",
            "--no-classical",
            "--working-size",
            "0",
            "--iterations",
            "3",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);

        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.segmentation.model.path.as_deref(),
            Some(std::path::Path::new("models/u2net.onnx"))
        );
        assert!(!config.segmentation.classical.enabled);
        assert_eq!(config.segmentation.classical.working_size, None);
        assert_eq!(config.segmentation.classical.iterations, 3);
    }

    #[test]
    fn test_cli_validation() {
        assert!(CliConfigBuilder::from_cli(&parse(&["--iterations", "0"])).is_err());
        assert!(CliConfigBuilder::from_cli(&parse(&["--timeout", "0"])).is_err());
        assert!(Cli::try_parse_from(["bgremove-server", "--port", "not-a-port"]).is_err());
    }
}
