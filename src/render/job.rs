//! One render job: a layer group in, a measured raster out.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{EngineError, RenderEngine};
use crate::dimensions::measure_png;
use crate::error::ConversionError;
use crate::types::{LayerGroup, RenderedImage};
use crate::DPMM;

/// Render job for one board side.
///
/// Produces bytes only; writing the artifact is left to the caller so that a
/// failed job never leaves anything behind.
pub struct RenderJob<'a> {
    group: &'a LayerGroup,
    timeout: Duration,
}

impl<'a> RenderJob<'a> {
    /// Create a job for a non-empty group.
    pub fn new(group: &'a LayerGroup, timeout: Duration) -> Self {
        Self { group, timeout }
    }

    /// Run the job against an engine.
    pub async fn run(&self, engine: &dyn RenderEngine) -> Result<RenderedImage, ConversionError> {
        let side = self.group.side;
        if self.group.is_empty() {
            return Err(ConversionError::Render {
                side,
                source: EngineError::Rasterize("empty layer group".to_string()),
            });
        }

        debug!(
            side = %side,
            engine = engine.name(),
            layer_count = self.group.len(),
            "render job started"
        );
        let start = Instant::now();

        let png = tokio::time::timeout(self.timeout, engine.render(&self.group.layers, DPMM))
            .await
            .map_err(|_| ConversionError::RenderTimeout {
                side,
                timeout: self.timeout,
            })?
            .map_err(|source| ConversionError::Render { side, source })?;

        let (width_px, height_px) = measure_png(&png).map_err(|e| ConversionError::Render {
            side,
            source: EngineError::Rasterize(format!("engine produced an unreadable image: {e}")),
        })?;

        info!(
            side = %side,
            engine = engine.name(),
            layer_count = self.group.len(),
            width_px = width_px,
            height_px = height_px,
            latency_ms = start.elapsed().as_millis() as u64,
            "render job complete"
        );

        Ok(RenderedImage {
            side,
            png,
            width_px,
            height_px,
        })
    }
}
