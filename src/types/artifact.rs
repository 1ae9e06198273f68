//! Artifact naming and store records.
//!
//! Every stored raster is named `output_{side}_{conversion_id}.png`. The name
//! is the only key the store accepts; anything that does not parse back into
//! an [`ArtifactKey`] is rejected before touching the filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::conversion::ConversionId;
use super::image::DimensionReport;
use super::side::Side;

const NAME_PREFIX: &str = "output_";
const NAME_SUFFIX: &str = ".png";

/// Store key for one artifact: which conversion, which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Owning conversion.
    pub conversion: ConversionId,
    /// Board side.
    pub side: Side,
}

impl ArtifactKey {
    /// Create a new key.
    pub fn new(conversion: ConversionId, side: Side) -> Self {
        Self { conversion, side }
    }

    /// File name under which the artifact is stored and served.
    pub fn file_name(&self) -> String {
        format!("{NAME_PREFIX}{}_{}{NAME_SUFFIX}", self.side, self.conversion)
    }

    /// Parse an artifact name back into its key.
    ///
    /// Returns `None` for anything outside the naming scheme, including
    /// names with path separators.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_prefix(NAME_PREFIX)?.strip_suffix(NAME_SUFFIX)?;
        let (side, id) = stem.split_once('_')?;
        let side = Side::from_str(side)?;
        let conversion = ConversionId::from_str(id).ok()?;

        let key = Self::new(conversion, side);
        // Reject non-canonical spellings (uppercase hex, braces, simple form).
        (key.file_name() == name).then_some(key)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Receipt returned by a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Key the artifact was stored under.
    pub key: ArtifactKey,
    /// Artifact name.
    pub name: String,
    /// When the artifact became visible in the store.
    pub created_at: DateTime<Utc>,
}

/// One artifact as reported by a store listing.
///
/// Dimensions are measured from the stored raster on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactListing {
    /// Key the artifact is stored under.
    pub key: ArtifactKey,
    /// Artifact name.
    pub name: String,
    /// Physical dimensions of the raster.
    pub dimensions: DimensionReport,
    /// Creation timestamp used for age-based eviction.
    pub created_at: DateTime<Utc>,
}
