//! Rendered images and their physical dimension reports.

use serde::{Deserialize, Serialize};

use super::conversion::ConversionId;
use super::side::Side;

/// A raster produced by one render job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Side the source layer group belongs to.
    pub side: Side,
    /// PNG byte stream.
    pub png: Vec<u8>,
    /// Pixel width decoded from the PNG header.
    pub width_px: u32,
    /// Pixel height decoded from the PNG header.
    pub height_px: u32,
}

/// Physical size of one image in whole millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionReport {
    /// Width in millimeters.
    pub width_mm: u32,
    /// Height in millimeters.
    pub height_mm: u32,
}

/// One entry of a conversion result or store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Artifact name, usable with the store's `get`.
    pub name: String,
    /// Side of the board the image shows.
    pub side: Side,
    /// Physical dimensions.
    pub dimensions: DimensionReport,
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Identifier namespacing this conversion's artifacts.
    pub conversion_id: ConversionId,
    /// Produced images, top before bottom.
    pub images: Vec<ImageEntry>,
    /// Average dimensions across `images`; zero when empty.
    pub average: DimensionReport,
}

impl ConversionResult {
    /// Number of images produced.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Look up the entry for one side.
    pub fn image_for(&self, side: Side) -> Option<&ImageEntry> {
        self.images.iter().find(|entry| entry.side == side)
    }
}
