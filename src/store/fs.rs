//! Directory-backed artifact store.
//!
//! Artifacts live flat in one directory as `output_{side}_{id}.png`. Writes
//! go to a hidden `.output_…png.part` file first and are renamed into place.
//! Creation time is the file's modification time, so artifacts left by a
//! previous process are still swept.
//!
//! Removal is an unlink: a reader that already opened a file keeps a valid
//! handle, a reader that has not yet opened it gets `NotFound`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{ArtifactStore, StoreError};
use crate::types::{ArtifactKey, ArtifactListing, ConversionId, DimensionReport, StoredArtifact};

const PARTIAL_PREFIX: &str = ".";
const PARTIAL_SUFFIX: &str = ".part";

/// One file in the store directory that belongs to the store.
struct Entry {
    path: PathBuf,
    name: String,
    key: ArtifactKey,
    partial: bool,
    modified: SystemTime,
}

/// Artifact store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path for an artifact.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn partial_path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(format!("{PARTIAL_PREFIX}{}{PARTIAL_SUFFIX}", key.file_name()))
    }

    // Recognize artifact and in-flight partial names; everything else in the
    // directory is left alone.
    fn parse_entry_name(name: &str) -> Option<(ArtifactKey, bool)> {
        if let Some(key) = ArtifactKey::parse(name) {
            return Some((key, false));
        }
        let inner = name
            .strip_prefix(PARTIAL_PREFIX)?
            .strip_suffix(PARTIAL_SUFFIX)?;
        ArtifactKey::parse(inner).map(|key| (key, true))
    }

    async fn entries(&self) -> Result<Vec<Entry>, StoreError> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            // Directory removed out from under us: nothing stored.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let Some(name) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some((key, partial)) = Self::parse_entry_name(&name) else {
                continue;
            };
            let metadata = match item.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push(Entry {
                path: item.path(),
                name,
                key,
                partial,
                modified: metadata.modified()?,
            });
        }

        Ok(entries)
    }

    // Unlink one file; a file already gone does not count.
    async fn remove(&self, entry: &Entry) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(&entry.path).await {
            Ok(()) => {
                debug!(name = %entry.name, "artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_where<F>(&self, mut predicate: F) -> Result<usize, StoreError>
    where
        F: FnMut(&Entry) -> bool + Send,
    {
        let mut removed = 0;
        for entry in self.entries().await? {
            if predicate(&entry) && self.remove(&entry).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: ArtifactKey, png: &[u8]) -> Result<StoredArtifact, StoreError> {
        let partial = self.partial_path_for(&key);
        let path = self.path_for(&key);

        if let Err(e) = tokio::fs::write(&partial, png).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        Ok(StoredArtifact {
            key,
            name: key.file_name(),
            created_at: Utc::now(),
        })
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let key = ArtifactKey::parse(name).ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        match tokio::fs::read(self.path_for(&key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ArtifactListing>, StoreError> {
        let mut listings = Vec::new();

        for entry in self.entries().await? {
            if entry.partial {
                continue;
            }
            let bytes = match tokio::fs::read(&entry.path).await {
                Ok(bytes) => bytes,
                // Swept or released between read_dir and read.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let dimensions = match DimensionReport::from_png(&bytes) {
                Ok(d) => d,
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "skipping unreadable artifact");
                    continue;
                }
            };
            listings.push(ArtifactListing {
                key: entry.key,
                name: entry.name,
                dimensions,
                created_at: DateTime::<Utc>::from(entry.modified),
            });
        }

        listings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));
        Ok(listings)
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize, StoreError> {
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return Ok(0);
        };
        self.remove_where(|entry| entry.modified <= cutoff).await
    }

    async fn release(&self, conversion: ConversionId) -> Result<usize, StoreError> {
        self.remove_where(|entry| entry.key.conversion == conversion).await
    }

    async fn purge_all(&self) -> Result<usize, StoreError> {
        self.remove_where(|_| true).await
    }
}
