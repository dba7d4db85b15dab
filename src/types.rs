//! Value types shared by the image operations and the HTTP layer

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` string; the leading `#` is optional
    ///
    /// # Errors
    /// Returns `InvalidInput` unless exactly six hex digits remain.
    pub fn from_hex(value: &str) -> Result<Self> {
        let hex = value.trim_start_matches('#');
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BgRemovalError::invalid_input(format!(
                "Background color must be in #RRGGBB format, got '{}'",
                value
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| BgRemovalError::invalid_input(format!("Invalid color '{}'", value)))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    #[must_use]
    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Color {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Layout of a passport photo print sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub margin: u32,
}

impl GridSpec {
    /// 35mm x 45mm at 300 DPI
    pub const DEFAULT_CELL_WIDTH: u32 = 413;
    pub const DEFAULT_CELL_HEIGHT: u32 = 531;
    pub const DEFAULT_MARGIN: u32 = 20;
    pub const DEFAULT_ROWS: u32 = 4;
    pub const DEFAULT_COLS: u32 = 4;

    /// Build a spec from signed request values, rejecting non-positive sizes
    ///
    /// # Errors
    /// Returns `InvalidInput` when a dimension is zero, negative or too large.
    pub fn from_signed(
        rows: i64,
        cols: i64,
        cell_width: i64,
        cell_height: i64,
        margin: i64,
    ) -> Result<Self> {
        let positive = |name: &str, value: i64| -> Result<u32> {
            if value <= 0 {
                return Err(BgRemovalError::invalid_input(format!(
                    "{} must be a positive integer, got {}",
                    name, value
                )));
            }
            u32::try_from(value)
                .map_err(|_| BgRemovalError::invalid_input(format!("{} is too large: {}", name, value)))
        };

        let margin = u32::try_from(margin).map_err(|_| {
            BgRemovalError::invalid_input(format!("margin must be a non-negative integer, got {}", margin))
        })?;

        Ok(Self {
            rows: positive("rows", rows)?,
            cols: positive("cols", cols)?,
            cell_width: positive("photo_width", cell_width)?,
            cell_height: positive("photo_height", cell_height)?,
            margin,
        })
    }

    /// Check that every dimension is positive
    ///
    /// # Errors
    /// Returns `InvalidInput` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("rows", self.rows),
            ("cols", self.cols),
            ("photo_width", self.cell_width),
            ("photo_height", self.cell_height),
        ] {
            if value == 0 {
                return Err(BgRemovalError::invalid_input(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Canvas size `(width, height)`, or `None` on overflow
    #[must_use]
    pub fn canvas_dimensions(&self) -> Option<(u32, u32)> {
        let extent = |count: u32, cell: u32| -> Option<u32> {
            count
                .checked_mul(cell)?
                .checked_add(count.checked_add(1)?.checked_mul(self.margin)?)
        };
        Some((
            extent(self.cols, self.cell_width)?,
            extent(self.rows, self.cell_height)?,
        ))
    }

    /// Top-left paste position of the cell at `row`, `col`
    #[must_use]
    pub fn cell_origin(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.margin + col * (self.cell_width + self.margin),
            self.margin + row * (self.cell_height + self.margin),
        )
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: Self::DEFAULT_ROWS,
            cols: Self::DEFAULT_COLS,
            cell_width: Self::DEFAULT_CELL_WIDTH,
            cell_height: Self::DEFAULT_CELL_HEIGHT,
            margin: Self::DEFAULT_MARGIN,
        }
    }
}

/// Segmentation strategy selected at startup
///
/// The serialized names are the ones existing clients already depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentationMethod {
    /// Neural salient-object model
    #[serde(rename = "rembg")]
    Ai,
    /// Iterative graph-cut classifier
    #[serde(rename = "opencv")]
    Classical,
    #[serde(rename = "none")]
    None,
}

impl SegmentationMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "rembg",
            Self::Classical => "opencv",
            Self::None => "none",
        }
    }

    /// Human readable quality label reported to clients
    #[must_use]
    pub fn quality(self) -> &'static str {
        match self {
            Self::Ai => "HIGH (AI)",
            Self::Classical => "MEDIUM (OpenCV)",
            Self::None => "LOW",
        }
    }
}

impl fmt::Display for SegmentationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::from_hex("#FF8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(Color::from_hex("00ff7f").unwrap(), Color::new(0, 255, 127));
        assert_eq!("#ffffff".parse::<Color>().unwrap(), Color::WHITE);
    }

    #[test]
    fn test_color_rejects_malformed_strings() {
        for bad in ["#ZZZZZZ", "#FFF", "#FFFFFFFF", "", "#", "#12345G", "#ÿÿÿ"] {
            let err = Color::from_hex(bad).unwrap_err();
            assert!(
                matches!(err, BgRemovalError::InvalidInput(_)),
                "expected InvalidInput for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::new(1, 171, 255).to_string(), "#01ABFF");
        assert_eq!(Color::default().to_string(), "#FFFFFF");
    }

    #[test]
    fn test_default_grid_canvas() {
        let spec = GridSpec::default();
        assert_eq!(spec.canvas_dimensions(), Some((1752, 2224)));
        assert_eq!(spec.cell_origin(0, 0), (20, 20));
        assert_eq!(spec.cell_origin(1, 1), (453, 571));
    }

    #[test]
    fn test_grid_from_signed_values() {
        let spec = GridSpec::from_signed(2, 3, 100, 120, 0).unwrap();
        assert_eq!(spec.canvas_dimensions(), Some((300, 240)));

        assert!(GridSpec::from_signed(0, 4, 413, 531, 20).is_err());
        assert!(GridSpec::from_signed(4, -1, 413, 531, 20).is_err());
        assert!(GridSpec::from_signed(4, 4, 413, 531, -5).is_err());
        assert!(GridSpec::from_signed(4, 4, i64::MAX, 531, 20).is_err());
    }

    #[test]
    fn test_grid_overflow_detected() {
        let spec = GridSpec {
            rows: 1,
            cols: u32::MAX,
            cell_width: 2,
            cell_height: 1,
            margin: 0,
        };
        assert_eq!(spec.canvas_dimensions(), None);
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(SegmentationMethod::Ai.as_str(), "rembg");
        assert_eq!(SegmentationMethod::Classical.quality(), "MEDIUM (OpenCV)");
        assert_eq!(SegmentationMethod::None.quality(), "LOW");
        assert_eq!(
            serde_json::to_string(&SegmentationMethod::Classical).unwrap(),
            "\"opencv\""
        );
    }
}
