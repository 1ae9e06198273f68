//! In-memory artifact store for testing.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use super::{ArtifactStore, StoreError};
use crate::types::{ArtifactKey, ArtifactListing, ConversionId, DimensionReport, StoredArtifact};

#[derive(Debug, Clone)]
struct MemoryEntry {
    png: Vec<u8>,
    created_at: DateTime<Utc>,
}

/// In-memory artifact store for testing.
///
/// Uses a BTreeMap keyed by [`ArtifactKey`] for deterministic iteration order.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: RwLock<BTreeMap<ArtifactKey, MemoryEntry>>,
}

impl InMemoryArtifactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact with an explicit creation time.
    pub fn put_at(&self, key: ArtifactKey, png: Vec<u8>, created_at: DateTime<Utc>) -> StoredArtifact {
        self.entries
            .write()
            .insert(key, MemoryEntry { png, created_at });
        StoredArtifact {
            key,
            name: key.file_name(),
            created_at,
        }
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Keys of all stored artifacts.
    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.entries.read().keys().copied().collect()
    }

    fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&ArtifactKey, &MemoryEntry) -> bool,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, entry| !predicate(key, entry));
        before - entries.len()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, key: ArtifactKey, png: &[u8]) -> Result<StoredArtifact, StoreError> {
        Ok(self.put_at(key, png.to_vec(), Utc::now()))
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        ArtifactKey::parse(name)
            .and_then(|key| self.entries.read().get(&key).map(|e| e.png.clone()))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<ArtifactListing>, StoreError> {
        // Snapshot under the lock, measure outside it.
        let snapshot: Vec<(ArtifactKey, MemoryEntry)> = self
            .entries
            .read()
            .iter()
            .map(|(k, e)| (*k, e.clone()))
            .collect();

        let mut listings: Vec<ArtifactListing> = snapshot
            .into_iter()
            .filter_map(|(key, entry)| match DimensionReport::from_png(&entry.png) {
                Ok(dimensions) => Some(ArtifactListing {
                    key,
                    name: key.file_name(),
                    dimensions,
                    created_at: entry.created_at,
                }),
                Err(e) => {
                    warn!(name = %key, error = %e, "skipping unreadable artifact");
                    None
                }
            })
            .collect();

        listings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));
        Ok(listings)
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize, StoreError> {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Ok(0);
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(0);
        };
        Ok(self.remove_where(|_, entry| entry.created_at <= cutoff))
    }

    async fn release(&self, conversion: ConversionId) -> Result<usize, StoreError> {
        Ok(self.remove_where(|key, _| key.conversion == conversion))
    }

    async fn purge_all(&self) -> Result<usize, StoreError> {
        Ok(self.remove_where(|_, _| true))
    }
}
