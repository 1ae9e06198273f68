//! Conversion error taxonomy.
//!
//! Every failure aborts the whole request. [`ErrorKind`] classifies a failure
//! as caller error or server error; the service maps kinds to HTTP statuses.

use std::fmt;
use std::time::Duration;

use crate::archive::ArchiveError;
use crate::render::EngineError;
use crate::store::StoreError;
use crate::types::Side;

/// Error type for a conversion request.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Upload is not a readable zip container.
    #[error("Uploaded file must be a ZIP archive: {0}")]
    InvalidArchive(String),

    /// No entry in the archive ends with the layer extension.
    #[error("No valid Gerber files found in the ZIP file")]
    NoLayersFound,

    /// A layer entry is not valid UTF-8.
    #[error("Layer file {name} is not valid UTF-8 text")]
    DecodeError {
        /// In-archive name of the offending entry.
        name: String,
    },

    /// Upload exceeds the configured size limit.
    #[error("Upload of {size} bytes exceeds the limit of {limit} bytes")]
    UploadTooLarge {
        /// Size of the rejected upload.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The render engine rejected a layer group.
    #[error("Rendering {side} layers failed: {source}")]
    Render {
        /// Side whose render failed.
        side: Side,
        /// Underlying engine failure.
        #[source]
        source: EngineError,
    },

    /// A render job ran past its time budget.
    #[error("Rendering {side} layers timed out after {}s", timeout.as_secs())]
    RenderTimeout {
        /// Side whose render timed out.
        side: Side,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// The blocking extraction task did not complete.
    #[error("Archive extraction failed: {0}")]
    Extraction(String),

    /// Artifact store failure.
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ArchiveError> for ConversionError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Decode { name } => Self::DecodeError { name },
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

impl ConversionError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArchive(_) => ErrorKind::InvalidArchive,
            Self::NoLayersFound => ErrorKind::NoLayersFound,
            Self::DecodeError { .. } => ErrorKind::DecodeError,
            Self::UploadTooLarge { .. } => ErrorKind::UploadTooLarge,
            Self::Render { .. } | Self::RenderTimeout { .. } => ErrorKind::RenderError,
            Self::Extraction(_) => ErrorKind::Internal,
            Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Failure class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Upload is not a zip.
    InvalidArchive,
    /// Zip holds no layer files.
    NoLayersFound,
    /// Layer text is not UTF-8.
    DecodeError,
    /// Upload is over the size limit.
    UploadTooLarge,
    /// Parser, rasterizer or timeout failure.
    RenderError,
    /// Requested artifact does not exist.
    NotFound,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArchive => "INVALID_ARCHIVE",
            Self::NoLayersFound => "NO_LAYERS_FOUND",
            Self::DecodeError => "DECODE_ERROR",
            Self::UploadTooLarge => "UPLOAD_TOO_LARGE",
            Self::RenderError => "RENDER_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    /// True when the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArchive
                | Self::NoLayersFound
                | Self::DecodeError
                | Self::UploadTooLarge
                | Self::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
