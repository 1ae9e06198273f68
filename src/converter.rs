//! Conversion orchestration.
//!
//! One call to [`Converter::convert`] takes an uploaded zip through:
//!
//! ```text
//! Received -> Validated -> Extracted -> Classified -> Rendering -> Measuring -> Storing -> Responding
//! ```
//!
//! Any failure aborts the request. Artifacts are written only after both
//! render jobs succeed, and a failure while storing releases whatever was
//! already written for the conversion.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::archive::{has_zip_magic, ArchiveReader, MAX_TOTAL_INFLATED_BYTES};
use crate::classifier::classify;
use crate::dimensions::average_of;
use crate::error::ConversionError;
use crate::render::{RenderEngine, RenderJob};
use crate::store::ArtifactStore;
use crate::types::{
    ArtifactKey, ConversionId, ConversionResult, DimensionReport, ImageEntry, LayerFile,
    LayerGroup, RenderedImage, Side,
};

/// Default render time budget per side.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Default upload size limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Limits applied to every conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSettings {
    /// Time budget for each render job.
    pub render_timeout: Duration,
    /// Largest accepted upload.
    pub max_upload_bytes: usize,
    /// Budget for all layer text inflated from one upload.
    pub max_inflated_bytes: u64,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_inflated_bytes: MAX_TOTAL_INFLATED_BYTES,
        }
    }
}

/// Step a conversion had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    /// Upload bytes received.
    Received,
    /// Upload is a readable zip within limits.
    Validated,
    /// Entry names read from the archive.
    Extracted,
    /// Layers split into top and bottom groups.
    Classified,
    /// Render jobs running.
    Rendering,
    /// Rasters measured.
    Measuring,
    /// Artifacts being written.
    Storing,
    /// Result assembled.
    Responding,
}

impl ConversionStage {
    /// Lowercase stage name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Extracted => "extracted",
            Self::Classified => "classified",
            Self::Rendering => "rendering",
            Self::Measuring => "measuring",
            Self::Storing => "storing",
            Self::Responding => "responding",
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns uploaded archives into stored, measured board images.
pub struct Converter<S: ArtifactStore + ?Sized> {
    store: Arc<S>,
    engine: Arc<dyn RenderEngine>,
    settings: ConversionSettings,
}

impl<S: ArtifactStore + ?Sized> Clone for Converter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            settings: self.settings,
        }
    }
}

impl<S: ArtifactStore + ?Sized> Converter<S> {
    /// Create a converter writing to `store` and rendering with `engine`.
    pub fn new(store: Arc<S>, engine: Arc<dyn RenderEngine>, settings: ConversionSettings) -> Self {
        Self {
            store,
            engine,
            settings,
        }
    }

    /// Store artifacts are written to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Limits in effect.
    pub fn settings(&self) -> ConversionSettings {
        self.settings
    }

    /// Convert one uploaded zip.
    pub async fn convert(&self, upload: Vec<u8>) -> Result<ConversionResult, ConversionError> {
        let conversion_id = ConversionId::generate();
        let start = Instant::now();
        let upload_bytes = upload.len();
        let mut stage = ConversionStage::Received;

        match self.run(conversion_id, upload, &mut stage).await {
            Ok(result) => {
                info!(
                    conversion_id = %conversion_id,
                    image_count = result.image_count(),
                    width_mm = result.average.width_mm,
                    height_mm = result.average.height_mm,
                    upload_bytes = upload_bytes,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "conversion complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    conversion_id = %conversion_id,
                    stage = %stage,
                    kind = e.kind().code(),
                    error = %e,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "conversion failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        conversion_id: ConversionId,
        upload: Vec<u8>,
        stage: &mut ConversionStage,
    ) -> Result<ConversionResult, ConversionError> {
        let limit = self.settings.max_upload_bytes;
        if upload.len() > limit {
            return Err(ConversionError::UploadTooLarge {
                size: upload.len(),
                limit,
            });
        }
        if !has_zip_magic(&upload) {
            return Err(ConversionError::InvalidArchive(
                "missing zip signature".to_string(),
            ));
        }

        // Inflation is CPU and memory bound; keep it off the async workers.
        let budget = self.settings.max_inflated_bytes;
        let (reached, extracted) = tokio::task::spawn_blocking(move || {
            let mut reached = ConversionStage::Received;
            let extracted = extract_layers(upload, budget, &mut reached);
            (reached, extracted)
        })
        .await
        .map_err(|e| ConversionError::Extraction(e.to_string()))?;
        *stage = reached;
        let (top, bottom) = extracted?;

        debug!(
            conversion_id = %conversion_id,
            top_layers = top.len(),
            bottom_layers = bottom.len(),
            "layers classified"
        );

        *stage = ConversionStage::Rendering;
        let (top_image, bottom_image) =
            tokio::try_join!(self.render_group(&top), self.render_group(&bottom))?;

        *stage = ConversionStage::Measuring;
        let rendered: Vec<RenderedImage> = [top_image, bottom_image].into_iter().flatten().collect();

        *stage = ConversionStage::Storing;
        let images = match self.store_all(conversion_id, &rendered).await {
            Ok(images) => images,
            Err(e) => {
                if let Err(release_err) = self.store.release(conversion_id).await {
                    warn!(
                        conversion_id = %conversion_id,
                        error = %release_err,
                        "failed to release partial conversion"
                    );
                }
                return Err(e);
            }
        };

        *stage = ConversionStage::Responding;
        let average = average_of(&images);
        Ok(ConversionResult {
            conversion_id,
            images,
            average,
        })
    }

    async fn render_group(&self, group: &LayerGroup) -> Result<Option<RenderedImage>, ConversionError> {
        if group.is_empty() {
            return Ok(None);
        }
        RenderJob::new(group, self.settings.render_timeout)
            .run(self.engine.as_ref())
            .await
            .map(Some)
    }

    async fn store_all(
        &self,
        conversion_id: ConversionId,
        rendered: &[RenderedImage],
    ) -> Result<Vec<ImageEntry>, ConversionError> {
        let mut images = Vec::with_capacity(rendered.len());
        for image in rendered {
            let stored = self
                .store
                .put(ArtifactKey::new(conversion_id, image.side), &image.png)
                .await?;
            images.push(ImageEntry {
                name: stored.name,
                side: image.side,
                dimensions: DimensionReport::from_pixels(image.width_px, image.height_px),
            });
        }
        Ok(images)
    }
}

/// Open the upload, classify its entries and read every layer's text.
fn extract_layers(
    upload: Vec<u8>,
    inflated_budget: u64,
    stage: &mut ConversionStage,
) -> Result<(LayerGroup, LayerGroup), ConversionError> {
    let mut archive = ArchiveReader::from_bytes(upload)?.with_inflated_limit(inflated_budget);
    *stage = ConversionStage::Validated;

    let names = archive.names();
    *stage = ConversionStage::Extracted;

    let classification = classify(&names)?;
    *stage = ConversionStage::Classified;

    let mut top = LayerGroup::new(Side::Top);
    let mut bottom = LayerGroup::new(Side::Bottom);
    for group in [&mut top, &mut bottom] {
        for name in classification.names(group.side) {
            let content = archive.read_text(name)?;
            group.push(LayerFile::new(name.clone(), content));
        }
    }
    Ok((top, bottom))
}
