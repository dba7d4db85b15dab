//! Request and response bodies

use crate::{
    error::{BgRemovalError, Result},
    types::{GridSpec, SegmentationMethod},
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /change-background`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeBackgroundRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
}

/// Body of `POST /create-passport-grid`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PassportGridRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub cols: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub rows: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub photo_width: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub photo_height: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub margin: Option<i64>,
}

impl PassportGridRequest {
    /// Grid layout with defaults filled in
    ///
    /// # Errors
    /// Returns `InvalidInput` for non-positive or oversized values.
    pub fn grid_spec(&self) -> Result<GridSpec> {
        GridSpec::from_signed(
            self.rows.unwrap_or(i64::from(GridSpec::DEFAULT_ROWS)),
            self.cols.unwrap_or(i64::from(GridSpec::DEFAULT_COLS)),
            self.photo_width
                .unwrap_or(i64::from(GridSpec::DEFAULT_CELL_WIDTH)),
            self.photo_height
                .unwrap_or(i64::from(GridSpec::DEFAULT_CELL_HEIGHT)),
            self.margin.unwrap_or(i64::from(GridSpec::DEFAULT_MARGIN)),
        )
    }
}

/// The `image` field, or the error every JSON endpoint reports when it is absent
pub(crate) fn required_image(image: Option<String>) -> Result<String> {
    image.ok_or_else(|| BgRemovalError::input_missing("No image data provided"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub method: SegmentationMethod,
    pub quality: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveBackgroundResponse {
    pub success: bool,
    pub image: String,
    pub method: SegmentationMethod,
    pub quality: String,
}

/// Response of the compositing and grid endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub success: bool,
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Accept a JSON integer, an integral float or a numeric string
fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, got {number}"))),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got \"{text}\""))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {other}"))),
    }
}
