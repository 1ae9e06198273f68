//! Artifact storage backends.
//!
//! The store is the only state shared between requests. Artifacts are keyed
//! by [`ArtifactKey`] (conversion id + side), so concurrent conversions never
//! write to the same name, and every read, listing and release can be scoped
//! to one conversion.

pub mod fs;
pub mod memory;
pub mod sweeper;

use std::time::Duration;

use async_trait::async_trait;

use crate::types::{ArtifactKey, ArtifactListing, ConversionId, StoredArtifact};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No artifact with this name, or the name is outside the naming scheme.
    #[error("Image not found: {0}")]
    NotFound(String),
    /// Underlying I/O failure.
    #[error("Artifact store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for artifact storage backends.
///
/// Listings are ordered by creation time, then key. Dimensions in a listing
/// are measured from the stored raster on every call.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a PNG under `key`, replacing any previous artifact with that key.
    ///
    /// The artifact becomes visible atomically: readers see either nothing or
    /// the complete raster.
    async fn put(&self, key: ArtifactKey, png: &[u8]) -> Result<StoredArtifact, StoreError>;

    /// Fetch an artifact by name.
    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// List every stored artifact.
    async fn list(&self) -> Result<Vec<ArtifactListing>, StoreError>;

    /// List the artifacts of one conversion.
    async fn list_for(&self, conversion: ConversionId) -> Result<Vec<ArtifactListing>, StoreError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|listing| listing.key.conversion == conversion)
            .collect())
    }

    /// Remove artifacts at least `max_age` old. Returns the number removed.
    async fn sweep(&self, max_age: Duration) -> Result<usize, StoreError>;

    /// Remove every artifact of one conversion. Returns the number removed.
    async fn release(&self, conversion: ConversionId) -> Result<usize, StoreError>;

    /// Remove everything. Returns the number removed.
    async fn purge_all(&self) -> Result<usize, StoreError>;
}

pub use fs::FsArtifactStore;
pub use memory::InMemoryArtifactStore;
pub use sweeper::{spawn_sweeper, RetentionPolicy};
