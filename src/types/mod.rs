//! Core types for the render service.

pub mod side;
pub mod conversion;
pub mod layer;
pub mod image;
pub mod artifact;

pub use side::Side;
pub use conversion::ConversionId;
pub use layer::{LayerFile, LayerGroup};
pub use image::{RenderedImage, DimensionReport, ImageEntry, ConversionResult};
pub use artifact::{ArtifactKey, StoredArtifact, ArtifactListing};
