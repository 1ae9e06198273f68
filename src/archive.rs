//! Zip ingestion.
//!
//! Opens an uploaded archive from memory (or disk) and yields entry names and
//! entry contents as UTF-8 text.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

/// Largest single entry that will be decompressed (64 MiB).
///
/// Guards against zip bombs: an entry claiming or inflating past this size is
/// rejected instead of read.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Default budget for all entries read from one archive (256 MiB).
///
/// Many entries each under [`MAX_ENTRY_BYTES`] can still inflate far past the
/// upload size; reads past this total are rejected.
pub const MAX_TOTAL_INFLATED_BYTES: u64 = 256 * 1024 * 1024;

const LOCAL_FILE_MAGIC: &[u8; 4] = b"PK\x03\x04";
const EMPTY_ARCHIVE_MAGIC: &[u8; 4] = b"PK\x05\x06";

/// Error type for archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Container could not be parsed.
    #[error("{0}")]
    Invalid(String),
    /// Entry does not exist.
    #[error("Archive entry not found: {0}")]
    MissingEntry(String),
    /// Entry is larger than [`MAX_ENTRY_BYTES`].
    #[error("Archive entry {name} exceeds {limit} bytes")]
    EntryTooLarge {
        /// Entry name.
        name: String,
        /// Size limit.
        limit: u64,
    },
    /// Entries read so far exceed the archive's inflation budget.
    #[error("Archive inflates past {limit} bytes")]
    InflatedTooLarge {
        /// Total budget.
        limit: u64,
    },
    /// Entry is not UTF-8.
    #[error("Archive entry {name} is not valid UTF-8")]
    Decode {
        /// Entry name.
        name: String,
    },
}

impl From<ZipError> for ArchiveError {
    fn from(e: ZipError) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// True if `bytes` start with a zip local-file or empty-archive signature.
pub fn has_zip_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(LOCAL_FILE_MAGIC) || bytes.starts_with(EMPTY_ARCHIVE_MAGIC)
}

/// Read access to the entries of a zip container.
pub struct ArchiveReader<R: Read + Seek = Cursor<Vec<u8>>> {
    archive: ZipArchive<R>,
    inflated_limit: u64,
    remaining: u64,
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Open an in-memory upload.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        Self::new(Cursor::new(bytes))
    }
}

impl ArchiveReader<File> {
    /// Open a zip file on disk.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path)
            .map_err(|e| ArchiveError::Invalid(format!("{}: {}", path.display(), e)))?;
        Self::new(file)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open any seekable reader as a zip container.
    pub fn new(reader: R) -> Result<Self, ArchiveError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
            inflated_limit: MAX_TOTAL_INFLATED_BYTES,
            remaining: MAX_TOTAL_INFLATED_BYTES,
        })
    }

    /// Replace the total inflation budget.
    pub fn with_inflated_limit(mut self, limit: u64) -> Self {
        self.inflated_limit = limit;
        self.remaining = limit;
        self
    }

    /// Bytes still readable before the inflation budget is exhausted.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Names of all file entries, in central directory order.
    ///
    /// Directory entries are skipped.
    pub fn names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// True if the archive has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Read raw bytes of one entry.
    pub fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ArchiveError::MissingEntry(name.to_string()),
            other => other.into(),
        })?;

        let too_large = || ArchiveError::EntryTooLarge {
            name: name.to_string(),
            limit: MAX_ENTRY_BYTES,
        };
        if entry.size() > MAX_ENTRY_BYTES {
            return Err(too_large());
        }

        let over_budget = ArchiveError::InflatedTooLarge {
            limit: self.inflated_limit,
        };
        if entry.size() > self.remaining {
            return Err(over_budget);
        }

        // The declared size can lie; cap what is actually inflated.
        let cap = MAX_ENTRY_BYTES.min(self.remaining);
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .take(cap + 1)
            .read_to_end(&mut buf)
            .map_err(|e| ArchiveError::Invalid(format!("{name}: {e}")))?;
        let read = buf.len() as u64;
        if read > MAX_ENTRY_BYTES {
            return Err(too_large());
        }
        if read > self.remaining {
            return Err(over_budget);
        }
        self.remaining -= read;

        Ok(buf)
    }

    /// Read one entry and decode it as UTF-8.
    pub fn read_text(&mut self, name: &str) -> Result<String, ArchiveError> {
        let bytes = self.read_bytes(name)?;
        String::from_utf8(bytes).map_err(|_| ArchiveError::Decode {
            name: name.to_string(),
        })
    }
}
