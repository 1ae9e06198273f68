//! Render engines and render jobs.
//!
//! The geometric parsing and rasterization of Gerber is not done here. It is
//! consumed through [`RenderEngine`], a stateless capability that turns a set
//! of layer texts into one PNG. [`RenderJob`] wraps one engine call for one
//! board side with a time budget and measures the result.

pub mod command;
pub mod fixed;
pub mod job;

use async_trait::async_trait;

use crate::types::LayerFile;

/// Error type for render engines.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A layer text could not be parsed.
    #[error("Failed to parse layer {layer}: {message}")]
    Parse {
        /// In-archive name of the layer.
        layer: String,
        /// Parser message.
        message: String,
    },
    /// Rasterization failed or produced no usable image.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),
    /// Engine I/O failure.
    #[error("Render engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability that rasterizes one board side.
///
/// Implementations parse every layer, merge them into one board-side project
/// and rasterize it at `dpmm` dots per millimeter. No state may carry over
/// between calls. A failure on any layer fails the whole call.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Render `layers` to PNG bytes.
    async fn render(&self, layers: &[LayerFile], dpmm: u32) -> Result<Vec<u8>, EngineError>;
}

pub use command::CommandEngine;
pub use fixed::FixedRasterEngine;
pub use job::RenderJob;
