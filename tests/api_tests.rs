//! End-to-end tests driving the HTTP router
//!
//! Requests go through the full middleware stack with `tower::ServiceExt::oneshot`;
//! no socket is bound.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bgremove_server::{
    error::Result,
    server::{router, AppState},
    services::{ImageIOService, PNG_DATA_URI_PREFIX},
    types::SegmentationMethod,
    SegmentationBackend, Segmenter, ServerConfig,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "----bgremove-test-boundary";

/// Keeps the left half of every image
struct LeftHalfSegmenter;

impl Segmenter for LeftHalfSegmenter {
    fn method(&self) -> SegmentationMethod {
        SegmentationMethod::Ai
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let mask = GrayImage::from_fn(width, height, |x, _| Luma([if x < width / 2 { 255 } else { 0 }]));
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            Rgba([r, g, b, mask.get_pixel(x, y)[0]])
        }))
    }
}

fn app(backend: SegmentationBackend) -> Router {
    router(Arc::new(AppState::new(backend, ServerConfig::default())))
}

fn mock_app() -> Router {
    app(SegmentationBackend::new(Box::new(LeftHalfSegmenter)))
}

fn png_bytes(image: DynamicImage) -> Vec<u8> {
    ImageIOService::encode_png(&image, None).unwrap()
}

fn data_uri(image: DynamicImage) -> String {
    ImageIOService::to_data_uri(&png_bytes(image))
}

fn decode_data_uri(uri: &str) -> DynamicImage {
    assert!(uri.starts_with(PNG_DATA_URI_PREFIX), "unexpected payload prefix");
    ImageIOService::load_from_base64(uri).unwrap()
}

fn multipart_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/remove-background")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_selected_method() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["message"], "Background removal API is running");
    assert_eq!(body["method"], "rembg");
    assert_eq!(body["quality"], "HIGH (AI)");
}

#[tokio::test]
async fn test_health_without_backend() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(SegmentationBackend::unavailable()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "none");
    assert_eq!(body["quality"], "LOW");
}

#[tokio::test]
async fn test_remove_background_applies_mask() {
    let input = RgbImage::from_pixel(8, 4, Rgb([10, 120, 230]));
    let request = multipart_request("image", "photo.png", &png_bytes(DynamicImage::ImageRgb8(input)));
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "rembg");
    assert_eq!(body["quality"], "HIGH (AI)");

    let output = decode_data_uri(body["image"].as_str().unwrap()).to_rgba8();
    assert_eq!(output.dimensions(), (8, 4));
    assert_eq!(output.get_pixel(1, 1).0, [10, 120, 230, 255]);
    assert_eq!(output.get_pixel(6, 2)[3], 0);
}

#[tokio::test]
async fn test_remove_background_requires_image_field() {
    let request = multipart_request("file", "photo.png", b"ignored");
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn test_remove_background_rejects_corrupt_upload() {
    let request = multipart_request("image", "photo.png", b"not an image at all");
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
}

#[tokio::test]
async fn test_remove_background_without_backend() {
    let input = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
    let request = multipart_request("image", "photo.png", &png_bytes(DynamicImage::ImageRgb8(input)));
    let (status, body) = send(app(SegmentationBackend::unavailable()), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No background removal method available");
}

#[cfg(feature = "classical")]
#[tokio::test]
async fn test_classical_backend_keeps_narrow_image_opaque() {
    use bgremove_server::{config::ClassicalConfig, segmentation::ClassicalSegmenter};

    let backend = SegmentationBackend::new(Box::new(ClassicalSegmenter::new(
        ClassicalConfig::default(),
    )));
    let input = RgbImage::from_pixel(2, 30, Rgb([200, 100, 50]));
    let request = multipart_request("image", "narrow.png", &png_bytes(DynamicImage::ImageRgb8(input)));
    let (status, body) = send(app(backend), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "opencv");
    assert_eq!(body["quality"], "MEDIUM (OpenCV)");

    let output = decode_data_uri(body["image"].as_str().unwrap()).to_rgba8();
    assert!(output.pixels().all(|p| p.0 == [200, 100, 50, 255]));
}

#[tokio::test]
async fn test_change_background_composites_onto_color() {
    let mut input = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
    input.put_pixel(0, 0, Rgba([0, 0, 255, 0]));
    let body = json!({
        "image": data_uri(DynamicImage::ImageRgba8(input)),
        "background_color": "#FF0000",
    });
    let (status, body) = send(mock_app(), json_request("/change-background", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let output = decode_data_uri(body["image"].as_str().unwrap());
    assert!(!output.color().has_alpha());
    let output = output.to_rgb8();
    assert_eq!(output.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(output.get_pixel(3, 3).0, [0, 0, 255]);
}

#[tokio::test]
async fn test_change_background_defaults_to_white_and_raw_base64() {
    let input = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 0]));
    let raw = STANDARD.encode(png_bytes(DynamicImage::ImageRgba8(input)));
    let (status, body) = send(mock_app(), json_request("/change-background", &json!({ "image": raw }))).await;

    assert_eq!(status, StatusCode::OK);
    let output = decode_data_uri(body["image"].as_str().unwrap()).to_rgb8();
    assert!(output.pixels().all(|p| p.0 == [255, 255, 255]));
}

#[tokio::test]
async fn test_change_background_validation_errors() {
    let (status, body) = send(mock_app(), json_request("/change-background", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");

    let image = data_uri(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
    let request = json_request(
        "/change-background",
        &json!({ "image": image, "background_color": "#ZZZZZZ" }),
    );
    let (status, _) = send(mock_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = json_request("/change-background", &json!({ "image": "data:image/png;base64,@@@" }));
    let (status, _) = send(mock_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/change-background")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(mock_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_passport_grid_defaults() {
    let photo = RgbImage::from_pixel(100, 130, Rgb([30, 60, 90]));
    let body = json!({ "image": data_uri(DynamicImage::ImageRgb8(photo)) });
    let (status, body) = send(mock_app(), json_request("/create-passport-grid", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let uri = body["image"].as_str().unwrap();
    let bytes = ImageIOService::decode_base64(uri).unwrap();
    let decoder = png::Decoder::new(std::io::Cursor::new(&bytes));
    let reader = decoder.read_info().unwrap();
    let info = reader.info();
    assert_eq!((info.width, info.height), (1752, 2224));
    let dims = info.pixel_dims.expect("sheet carries a resolution");
    assert_eq!((dims.xppu, dims.yppu), (11811, 11811));

    let sheet = decode_data_uri(uri).to_rgb8();
    assert_eq!(sheet.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(sheet.get_pixel(19, 19).0, [255, 255, 255]);
    assert_eq!(sheet.get_pixel(20, 20).0, [30, 60, 90]);
    assert_eq!(sheet.get_pixel(453, 571).0, [30, 60, 90]);
    assert_eq!(sheet.get_pixel(440, 560).0, [255, 255, 255]);
}

#[tokio::test]
async fn test_passport_grid_accepts_string_dimensions() {
    let photo = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
    let body = json!({
        "image": data_uri(DynamicImage::ImageRgba8(photo)),
        "cols": "2",
        "rows": 1,
        "photo_width": "10",
        "photo_height": 12,
        "margin": 5,
    });
    let (status, body) = send(mock_app(), json_request("/create-passport-grid", &body)).await;

    assert_eq!(status, StatusCode::OK);
    let sheet = decode_data_uri(body["image"].as_str().unwrap()).to_rgb8();
    assert_eq!(sheet.dimensions(), (35, 22));
    // transparent photo is flattened onto white
    assert!(sheet.pixels().all(|p| p.0 == [255, 255, 255]));
}

#[tokio::test]
async fn test_passport_grid_validation_errors() {
    let (status, body) = send(mock_app(), json_request("/create-passport-grid", &json!({ "cols": 2 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");

    let image = data_uri(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
    for bad in [
        json!({ "image": image, "cols": 0 }),
        json!({ "image": image, "rows": -3 }),
        json!({ "image": image, "photo_width": "wide" }),
        json!({ "image": image, "cols": 100000, "rows": 100000 }),
    ] {
        let (status, body) = send(mock_app(), json_request("/create-passport-grid", &bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "request {bad} should be rejected");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let request = Request::get("/nope").body(Body::empty()).unwrap();
    let response = mock_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
