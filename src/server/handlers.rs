//! Endpoint handlers
//!
//! Each handler validates and extracts its payload, runs the image work on a
//! blocking thread and serializes the result. Errors surface as
//! [`BgRemovalError`] and are rendered by its `IntoResponse` impl.

use super::{
    payload::{
        required_image, ChangeBackgroundRequest, HealthResponse, ImageResponse,
        PassportGridRequest, RemoveBackgroundResponse,
    },
    AppState,
};
use crate::{
    compositor,
    error::{BgRemovalError, Result},
    grid,
    services::{ImageIOService, PRINT_DPI},
    tracing_config::spans,
    types::Color,
};
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, State,
    },
    Json,
};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, Span};

/// Name of the multipart field carrying the upload
const IMAGE_FIELD: &str = "image";

/// Run CPU-bound image work off the async executor, inside the request span
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(task))
        .await
        .map_err(|e| BgRemovalError::processing(format!("Image task failed: {e}")))?
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| BgRemovalError::invalid_input(rejection.body_text()))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let method = state.backend.method();
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Background removal API is running".to_string(),
        method,
        quality: method.quality().to_string(),
    })
}

/// `POST /remove-background`
pub async fn remove_background(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<RemoveBackgroundResponse>> {
    let mut multipart =
        multipart.map_err(|rejection| BgRemovalError::invalid_input(rejection.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BgRemovalError::invalid_input(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if field.file_name() == Some("") {
            return Err(BgRemovalError::input_missing("No image file selected"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| BgRemovalError::invalid_input(e.body_text()))?;
        upload = Some(bytes);
        break;
    }
    let bytes = upload.ok_or_else(|| BgRemovalError::input_missing("No image file provided"))?;
    debug!(bytes = bytes.len(), "Received upload");

    let backend = Arc::clone(&state.backend);
    let method = backend.method();
    let image = run_blocking(move || {
        let rgb = spans::codec("decode", bytes.len())
            .in_scope(|| ImageIOService::load_from_bytes(&bytes))?
            .to_rgb8();
        let _span = spans::segmentation(method.as_str(), rgb.dimensions()).entered();
        let rgba = backend.segment(&rgb)?;
        ImageIOService::encode_data_uri(&DynamicImage::ImageRgba8(rgba), None)
    })
    .await?;

    Ok(Json(RemoveBackgroundResponse {
        success: true,
        image,
        method,
        quality: method.quality().to_string(),
    }))
}

/// `POST /change-background`
pub async fn change_background(
    body: std::result::Result<Json<ChangeBackgroundRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>> {
    let request = json_body(body)?;
    let payload = required_image(request.image)?;
    let color = match request.background_color.as_deref() {
        Some(value) => Color::from_hex(value)?,
        None => Color::WHITE,
    };

    let image = run_blocking(move || {
        let decoded = ImageIOService::load_from_base64(&payload)?;
        let dimensions = (decoded.width(), decoded.height());
        let _span = spans::compositing(&color.to_string(), dimensions).entered();
        let flattened = compositor::composite(&decoded, color);
        ImageIOService::encode_data_uri(&DynamicImage::ImageRgb8(flattened), None)
    })
    .await?;

    Ok(Json(ImageResponse {
        success: true,
        image,
    }))
}

/// `POST /create-passport-grid`
pub async fn create_passport_grid(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<PassportGridRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>> {
    let request = json_body(body)?;
    let spec = request.grid_spec();
    let payload = required_image(request.image)?;
    let spec = spec?;
    let limits = state.config.grid;

    let image = run_blocking(move || {
        let photo = ImageIOService::load_from_base64(&payload)?;
        let _span =
            spans::grid_layout(spec.rows, spec.cols, (spec.cell_width, spec.cell_height))
                .entered();
        let sheet = grid::tile(&photo, &spec, &limits)?;
        ImageIOService::encode_data_uri(&DynamicImage::ImageRgb8(sheet), Some(PRINT_DPI))
    })
    .await?;

    Ok(Json(ImageResponse {
        success: true,
        image,
    }))
}
