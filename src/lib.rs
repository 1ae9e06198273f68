//! # gerber-render
//!
//! Turns a zip of Gerber layer files into one PNG per board side and reports
//! the physical size of each image in millimeters.
//!
//! ## Pipeline
//!
//! ```text
//! upload.zip → ArchiveReader → classify → RenderJob (top ∥ bottom) → measure → ArtifactStore
//!                                              ↓
//!                                        RenderEngine (gerbv or fixed)
//! ```
//!
//! ## Guarantees
//!
//! - Layers ending in `.gbr` whose name contains `Top` render on the top side;
//!   every other layer renders on the bottom side
//! - Rendering and measuring share one resolution, [`DPMM`]
//! - Artifacts are namespaced by [`ConversionId`], so concurrent conversions
//!   never overwrite each other
//! - A failed conversion leaves no artifacts behind

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod error;
pub mod archive;
pub mod classifier;
pub mod dimensions;
pub mod render;
pub mod store;
pub mod converter;
pub mod config;

#[cfg(feature = "service")]
pub mod service;

/// Rendering resolution in dots per millimeter.
///
/// Used both to rasterize layers and to convert pixel sizes back to
/// millimeters.
pub const DPMM: u32 = 40;

// Re-exports
pub use types::{
    ArtifactKey, ArtifactListing, ConversionId, ConversionResult, DimensionReport, ImageEntry,
    LayerFile, LayerGroup, RenderedImage, Side, StoredArtifact,
};
pub use error::{ConversionError, ErrorKind};
pub use archive::{ArchiveError, ArchiveReader};
pub use classifier::{classify, Classification};
pub use dimensions::{average_mm, measure_png, pixels_to_mm};
pub use render::{CommandEngine, EngineError, FixedRasterEngine, RenderEngine, RenderJob};
pub use store::{
    spawn_sweeper, ArtifactStore, FsArtifactStore, InMemoryArtifactStore, RetentionPolicy,
    StoreError,
};
pub use converter::{ConversionSettings, ConversionStage, Converter};
pub use config::{EngineKind, ServiceConfig};
