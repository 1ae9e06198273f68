//! Axum routes for the render service.

use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::dimensions::average_of;
use crate::error::{ConversionError, ErrorKind};
use crate::store::{ArtifactStore, FsArtifactStore, StoreError};
use crate::types::{ArtifactListing, ConversionId, ConversionResult, DimensionReport, ImageEntry};

use super::middleware::record_conversion_metrics;
use super::state::ServiceState;

/// Type alias for the service state with FsArtifactStore.
pub type AppState = ServiceState<FsArtifactStore>;

/// Multipart field carrying the uploaded archive.
pub const UPLOAD_FIELD: &str = "file";

/// Headroom above the upload limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const SUCCESS_MESSAGE: &str = "Gerber files processed successfully";

// ============================================================================
// Request/Response Types
// ============================================================================

/// One image in a conversion result or listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDto {
    /// Artifact name.
    pub name: String,
    /// Width in millimeters.
    pub width: u32,
    /// Height in millimeters.
    pub height: u32,
    /// Download path for the PNG.
    pub url: String,
}

impl From<&ImageEntry> for ImageDto {
    fn from(entry: &ImageEntry) -> Self {
        Self {
            url: format!("/images/{}", entry.name),
            name: entry.name.clone(),
            width: entry.dimensions.width_mm,
            height: entry.dimensions.height_mm,
        }
    }
}

/// Average physical size across a set of images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageDto {
    /// Average width in millimeters.
    pub width: u32,
    /// Average height in millimeters.
    pub height: u32,
}

impl From<DimensionReport> for AverageDto {
    fn from(report: DimensionReport) -> Self {
        Self {
            width: report.width_mm,
            height: report.height_mm,
        }
    }
}

/// Response to a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    /// Identifier scoping this conversion's artifacts.
    pub conversion_id: String,
    /// Human-readable status.
    pub message: String,
    /// Produced images, top before bottom.
    pub available_images: Vec<ImageDto>,
    /// Average dimensions of `available_images`.
    pub average_dimensions: AverageDto,
}

impl From<ConversionResult> for ConvertResponse {
    fn from(result: ConversionResult) -> Self {
        Self {
            conversion_id: result.conversion_id.to_string(),
            message: SUCCESS_MESSAGE.to_string(),
            available_images: result.images.iter().map(ImageDto::from).collect(),
            average_dimensions: result.average.into(),
        }
    }
}

/// Query parameters for the image listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Restrict the listing to one conversion.
    pub conversion_id: Option<String>,
}

/// Stored images and their average dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// Stored images, oldest first.
    pub available_images: Vec<ImageDto>,
    /// Average dimensions of `available_images`.
    pub average_dimensions: AverageDto,
}

impl ListResponse {
    fn from_listings(listings: Vec<ArtifactListing>) -> Self {
        let entries: Vec<ImageEntry> = listings
            .into_iter()
            .map(|listing| ImageEntry {
                name: listing.name,
                side: listing.key.side,
                dimensions: listing.dimensions,
            })
            .collect();
        Self {
            available_images: entries.iter().map(ImageDto::from).collect(),
            average_dimensions: average_of(&entries).into(),
        }
    }
}

/// Result of releasing a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    /// Released conversion.
    pub conversion_id: String,
    /// Number of artifacts removed.
    pub released: usize,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `"alive"`.
    pub status: String,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub detail: String,
    /// Machine-readable error code.
    pub code: String,
    #[serde(skip)]
    status: StatusCode,
}

impl ErrorResponse {
    /// Create an error response with an explicit status.
    pub fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
            status,
        }
    }

    /// Create an error response for a failure class.
    pub fn from_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::new(status_for(kind), kind.code(), detail)
    }

    /// HTTP status of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ConversionError> for ErrorResponse {
    fn from(e: ConversionError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<StoreError> for ErrorResponse {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::from_kind(ErrorKind::NotFound, "Image not found"),
            other => Self::from_kind(ErrorKind::Internal, other.to_string()),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, detail = %self.detail, "Request error");
        } else {
            tracing::warn!(code = %self.code, detail = %self.detail, "Request error");
        }
        (self.status, Json(self)).into_response()
    }
}

/// HTTP status for a failure class.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArchive | ErrorKind::NoLayersFound | ErrorKind::DecodeError => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RenderError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn invalid_conversion_id(raw: &str) -> ErrorResponse {
    ErrorResponse::new(
        StatusCode::BAD_REQUEST,
        "INVALID_CONVERSION_ID",
        format!("Invalid conversion id: {raw}"),
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Convert an uploaded zip of Gerber layers into top and bottom images.
async fn convert_handler<S: ArtifactStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, ErrorResponse> {
    let start = Instant::now();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if let Some(file_name) = field.file_name() {
            if !file_name.to_ascii_lowercase().ends_with(".zip") {
                return Err(ErrorResponse::from_kind(
                    ErrorKind::InvalidArchive,
                    "Uploaded file must be a ZIP file",
                ));
            }
        }
        upload = Some(field.bytes().await.map_err(multipart_error)?);
        break;
    }

    let upload = upload.ok_or_else(|| {
        ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "MISSING_FILE",
            format!("Multipart field '{UPLOAD_FIELD}' is required"),
        )
    })?;

    let result = state.converter.convert(upload.to_vec()).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(result) => {
            record_conversion_metrics("success", result.image_count(), latency_ms);
            Ok(Json(result.into()))
        }
        Err(e) => {
            record_conversion_metrics(e.kind().code(), 0, latency_ms);
            Err(e.into())
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ErrorResponse {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::UploadTooLarge.code()
    } else {
        "INVALID_MULTIPART"
    };
    ErrorResponse::new(status, code, e.body_text())
}

/// Download one stored image.
async fn image_handler<S: ArtifactStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let png = state.store.get(&name).await?;
    // Only stored artifact names reach here, so the name needs no escaping.
    let disposition = format!("attachment; filename=\"{name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    ))
}

/// List stored images, optionally for one conversion.
async fn list_images_handler<S: ArtifactStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ErrorResponse> {
    let listings = match query.conversion_id.as_deref() {
        Some(raw) => {
            let conversion =
                ConversionId::from_str(raw).map_err(|_| invalid_conversion_id(raw))?;
            state.store.list_for(conversion).await?
        }
        None => state.store.list().await?,
    };
    Ok(Json(ListResponse::from_listings(listings)))
}

/// Release every artifact of one conversion.
async fn release_handler<S: ArtifactStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(raw): Path<String>,
) -> Result<Json<ReleaseResponse>, ErrorResponse> {
    let conversion = ConversionId::from_str(&raw).map_err(|_| invalid_conversion_id(&raw))?;
    let released = state.store.release(conversion).await?;
    tracing::info!(conversion_id = %conversion, released = released, "conversion released");
    Ok(Json(ReleaseResponse {
        conversion_id: conversion.to_string(),
        released,
    }))
}

/// Liveness check endpoint.
///
/// Returns 200 while the process is alive. Does not touch the store.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the render service.
pub fn create_router<S: ArtifactStore + 'static>(state: ServiceState<S>) -> Router {
    let body_limit = state
        .converter
        .settings()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let state = Arc::new(state);

    Router::new()
        // Conversion
        .route("/convert", post(convert_handler::<S>))
        // Artifacts
        .route("/images/:name", get(image_handler::<S>))
        .route("/list-images", get(list_images_handler::<S>))
        .route("/conversions/:conversion_id", delete(release_handler::<S>))
        // Health
        .route("/health/live", get(liveness_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
