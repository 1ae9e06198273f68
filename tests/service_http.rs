//! HTTP tests for the render service router.
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`;
//! no socket is bound.

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use gerber_render::service::{create_router, ServiceState};
use gerber_render::{FixedRasterEngine, InMemoryArtifactStore, RenderEngine, ServiceConfig};

const BOUNDARY: &str = "gerber-render-test-boundary";

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn zip_of_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let entries: Vec<(&str, &[u8])> = entries.iter().map(|(n, c)| (*n, c.as_bytes())).collect();
    zip_of_bytes(&entries)
}

fn board_zip() -> Vec<u8> {
    zip_of(&[
        ("TopCopper.gbr", "G04 top*"),
        ("BottomCopper.gbr", "G04 bottom*"),
    ])
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write!(
        body,
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/zip\r\n\r\n"
    )
    .unwrap();
    body.extend_from_slice(content);
    write!(body, "\r\n--{BOUNDARY}--\r\n").unwrap();
    body
}

fn app_with_engine(engine: FixedRasterEngine, config: ServiceConfig) -> Router {
    let engine: Arc<dyn RenderEngine> = Arc::new(engine);
    let state = ServiceState::new(InMemoryArtifactStore::new(), engine, config);
    create_router(state)
}

fn app_with(config: ServiceConfig) -> Router {
    app_with_engine(FixedRasterEngine::new(100, 200), config)
}

fn app() -> Router {
    app_with(ServiceConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn upload(app: &Router, field: &str, file_name: &str, content: &[u8]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, content)))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ─────────────────────────────────────────────────────────────────────────────
// POST /convert
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_success() {
    let app = app();

    let (status, body) = upload(&app, "file", "board.zip", &board_zip()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Gerber files processed successfully");
    let images = body["available_images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0]["name"].as_str().unwrap().starts_with("output_top_"));
    assert!(images[1]["name"].as_str().unwrap().starts_with("output_bottom_"));
    assert_eq!(images[0]["width"], 3);
    assert_eq!(images[0]["height"], 5);
    assert_eq!(
        images[0]["url"],
        format!("/images/{}", images[0]["name"].as_str().unwrap())
    );
    assert_eq!(body["average_dimensions"]["width"], 3);
    assert_eq!(body["average_dimensions"]["height"], 5);
    assert!(body["conversion_id"].as_str().is_some());
}

#[tokio::test]
async fn test_convert_rejects_non_zip_content() {
    let (status, body) = upload(&app(), "file", "board.zip", b"not a zip at all").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ARCHIVE");
    assert!(body["detail"].as_str().is_some());
}

#[tokio::test]
async fn test_convert_rejects_non_zip_file_name() {
    let (status, body) = upload(&app(), "file", "board.rar", &board_zip()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Uploaded file must be a ZIP file");
}

#[tokio::test]
async fn test_convert_without_layers() {
    let upload_zip = zip_of(&[("notes.txt", "hello")]);
    let (status, body) = upload(&app(), "file", "board.zip", &upload_zip).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_LAYERS_FOUND");
    assert_eq!(body["detail"], "No valid Gerber files found in the ZIP file");
}

#[tokio::test]
async fn test_convert_missing_field() {
    let (status, body) = upload(&app(), "attachment", "board.zip", &board_zip()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_FILE");
}

#[tokio::test]
async fn test_convert_upload_too_large() {
    let app = app_with(ServiceConfig {
        max_upload_bytes: 32,
        ..ServiceConfig::default()
    });

    let (status, body) = upload(&app, "file", "board.zip", &board_zip()).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "UPLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_convert_undecodable_layer() {
    let upload_zip = zip_of_bytes(&[
        ("TopCopper.gbr", b"G04 top*".as_slice()),
        ("BottomCopper.gbr", &[0xff, 0xfe, 0x00, 0xc3]),
    ]);

    let (status, body) = upload(&app(), "file", "board.zip", &upload_zip).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DECODE_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("BottomCopper.gbr"));
}

#[tokio::test]
async fn test_convert_render_failure() {
    let app = app_with_engine(
        FixedRasterEngine::new(100, 200).fail_on("%BROKEN%"),
        ServiceConfig::default(),
    );
    let upload_zip = zip_of(&[
        ("TopCopper.gbr", "G04 top*"),
        ("BottomMask.gbr", "%BROKEN%"),
    ]);

    let (status, body) = upload(&app, "file", "board.zip", &upload_zip).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "RENDER_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("BottomMask.gbr"));

    // Nothing from the failed conversion is listed.
    let (_, listing) = get_json(&app, "/list-images").await;
    assert_eq!(listing["available_images"].as_array().unwrap().len(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Artifacts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_converted_image() {
    let app = app();
    let (_, body) = upload(&app, "file", "board.zip", &board_zip()).await;
    let url = body["available_images"][0]["url"].as_str().unwrap().to_string();

    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let name = body["available_images"][0]["name"].as_str().unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{name}\"").as_str()
    );
    let png = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(gerber_render::measure_png(&png).unwrap(), (100, 200));
}

#[tokio::test]
async fn test_download_unknown_image() {
    let (status, body) = get_json(&app(), "/images/output_top.png").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Image not found");
}

#[tokio::test]
async fn test_list_images_empty() {
    let (status, body) = get_json(&app(), "/list-images").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_images"].as_array().unwrap().len(), 0);
    assert_eq!(body["average_dimensions"]["width"], 0);
    assert_eq!(body["average_dimensions"]["height"], 0);
}

#[tokio::test]
async fn test_list_images_scoped_to_conversion() {
    let app = app();
    let (_, first) = upload(&app, "file", "a.zip", &board_zip()).await;
    upload(&app, "file", "b.zip", &board_zip()).await;

    let (_, all) = get_json(&app, "/list-images").await;
    assert_eq!(all["available_images"].as_array().unwrap().len(), 4);

    let id = first["conversion_id"].as_str().unwrap();
    let (status, scoped) = get_json(&app, &format!("/list-images?conversion_id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    let images = scoped["available_images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images
        .iter()
        .all(|image| image["name"].as_str().unwrap().contains(id)));
    assert_eq!(scoped["average_dimensions"]["width"], 3);
}

#[tokio::test]
async fn test_list_images_rejects_malformed_id() {
    let (status, body) = get_json(&app(), "/list-images?conversion_id=not-a-uuid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CONVERSION_ID");
}

#[tokio::test]
async fn test_release_conversion() {
    let app = app();
    let (_, body) = upload(&app, "file", "board.zip", &board_zip()).await;
    let id = body["conversion_id"].as_str().unwrap().to_string();
    let image_url = body["available_images"][0]["url"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/conversions/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, released) = send(&app, request).await;
    let released: Value = serde_json::from_slice(&released).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["conversion_id"], id.as_str());
    assert_eq!(released["released"], 2);

    let (status, _) = get_json(&app, &image_url).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_liveness() {
    let (status, body) = get_json(&app(), "/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}
