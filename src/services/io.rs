//! Image payload encoding and decoding service
//!
//! Request payloads arrive as raw multipart bytes or as base64 strings that may
//! carry a `data:` URI prefix; responses leave as PNG data URIs. This module
//! keeps those conversions out of the handlers.

use crate::error::{BgRemovalError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbImage, RgbaImage};
use std::io::Cursor;

/// Prefix of every image returned to clients
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Print resolution tagged on passport sheets
pub const PRINT_DPI: u32 = 300;

const METERS_PER_INCH: f64 = 0.0254;

/// Service for converting between wire payloads and rasters
pub struct ImageIOService;

impl ImageIOService {
    /// Strip an optional `data:<mime>;base64,` prefix from a payload string
    ///
    /// Everything up to and including the first comma is discarded.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_server::services::ImageIOService;
    ///
    /// assert_eq!(ImageIOService::strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
    /// assert_eq!(ImageIOService::strip_data_uri("QUJD"), "QUJD");
    /// ```
    #[must_use]
    pub fn strip_data_uri(payload: &str) -> &str {
        payload
            .split_once(',')
            .map_or(payload, |(_, data)| data)
            .trim()
    }

    /// Decode a base64 (optionally data-URI prefixed) payload into bytes
    ///
    /// ASCII whitespace, including line wraps, is ignored.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the payload is not valid base64.
    pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
        let data = Self::strip_data_uri(payload);
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|e| BgRemovalError::invalid_input(format!("Invalid base64 image data: {}", e)))
    }

    /// Decode image bytes, detecting the format from content
    ///
    /// # Errors
    /// Returns `InvalidInput` for empty, truncated or unsupported data.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(BgRemovalError::invalid_input("Image data is empty"));
        }
        image::load_from_memory(bytes).map_err(|e| BgRemovalError::image_decode_error(&e))
    }

    /// Decode a base64 image payload in one step
    ///
    /// # Errors
    /// Returns `InvalidInput` for bad base64 or undecodable image data.
    pub fn load_from_base64(payload: &str) -> Result<DynamicImage> {
        let bytes = Self::decode_base64(payload)?;
        Self::load_from_bytes(&bytes)
    }

    /// Encode an image as PNG with maximum compression
    ///
    /// When `dpi` is set, a `pHYs` chunk records that resolution.
    ///
    /// # Errors
    /// Returns `Processing` if the PNG encoder fails.
    pub fn encode_png(image: &DynamicImage, dpi: Option<u32>) -> Result<Vec<u8>> {
        match image {
            DynamicImage::ImageRgb8(rgb) => Self::encode_rgb_png(rgb, dpi),
            DynamicImage::ImageRgba8(rgba) => Self::encode_rgba_png(rgba, dpi),
            other if other.color().has_alpha() => Self::encode_rgba_png(&other.to_rgba8(), dpi),
            other => Self::encode_rgb_png(&other.to_rgb8(), dpi),
        }
    }

    /// Encode an RGB raster as PNG
    ///
    /// # Errors
    /// Returns `Processing` if the PNG encoder fails.
    pub fn encode_rgb_png(image: &RgbImage, dpi: Option<u32>) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        Self::write_png(image.as_raw(), width, height, png::ColorType::Rgb, dpi)
    }

    /// Encode an RGBA raster as PNG
    ///
    /// # Errors
    /// Returns `Processing` if the PNG encoder fails.
    pub fn encode_rgba_png(image: &RgbaImage, dpi: Option<u32>) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        Self::write_png(image.as_raw(), width, height, png::ColorType::Rgba, dpi)
    }

    /// Wrap PNG bytes in a `data:image/png;base64,` URI
    #[must_use]
    pub fn to_data_uri(png_bytes: &[u8]) -> String {
        format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(png_bytes))
    }

    /// Encode an image straight to a PNG data URI
    ///
    /// # Errors
    /// Returns `Processing` if the PNG encoder fails.
    pub fn encode_data_uri(image: &DynamicImage, dpi: Option<u32>) -> Result<String> {
        let png_bytes = Self::encode_png(image, dpi)?;
        Ok(Self::to_data_uri(&png_bytes))
    }

    /// Convert dots per inch to the pixels-per-meter unit PNG stores
    #[must_use]
    pub fn dpi_to_pixels_per_meter(dpi: u32) -> u32 {
        (f64::from(dpi) / METERS_PER_INCH).round() as u32
    }

    fn write_png(
        data: &[u8],
        width: u32,
        height: u32,
        color: png::ColorType,
        dpi: Option<u32>,
    ) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(Cursor::new(&mut buffer), width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Best);
            encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
            if let Some(dpi) = dpi {
                let ppm = Self::dpi_to_pixels_per_meter(dpi);
                encoder.set_pixel_dims(Some(png::PixelDimensions {
                    xppu: ppm,
                    yppu: ppm,
                    unit: png::Unit::Meter,
                }));
            }

            let encode_error = |e: png::EncodingError| {
                BgRemovalError::processing_stage_error(
                    "png encoding",
                    &e.to_string(),
                    Some(&format!("{}x{} {:?}", width, height, color)),
                )
            };

            let mut writer = encoder.write_header().map_err(encode_error)?;
            writer.write_image_data(data).map_err(encode_error)?;
            writer.finish().map_err(encode_error)?;
        }
        Ok(buffer)
    }
}
