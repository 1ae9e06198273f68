//! Deterministic render engine.
//!
//! Emits a blank PNG of a configured size for any input. Used in tests and
//! for running the service without an external rasterizer installed.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};

use super::{EngineError, RenderEngine};
use crate::types::LayerFile;

/// Engine returning a canned raster of known pixel dimensions.
#[derive(Debug, Default)]
pub struct FixedRasterEngine {
    width_px: u32,
    height_px: u32,
    fail_marker: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedRasterEngine {
    /// Create an engine producing `width_px` × `height_px` images.
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
            ..Self::default()
        }
    }

    /// Fail with a parse error on any layer whose content contains `marker`.
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Sleep before rendering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `render` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for FixedRasterEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn render(&self, layers: &[LayerFile], _dpmm: u32) -> Result<Vec<u8>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if layers.is_empty() {
            return Err(EngineError::Rasterize("nothing to rasterize".to_string()));
        }

        if let Some(marker) = &self.fail_marker {
            if let Some(layer) = layers.iter().find(|l| l.content.contains(marker.as_str())) {
                return Err(EngineError::Parse {
                    layer: layer.name.clone(),
                    message: format!("unexpected token {marker:?}"),
                });
            }
        }

        let image = RgbaImage::from_pixel(self.width_px, self.height_px, Rgba([0, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| EngineError::Rasterize(e.to_string()))?;
        Ok(out.into_inner())
    }
}
