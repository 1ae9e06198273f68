//! Conversion identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;

/// Identifier for one conversion request.
///
/// Generated when a request is received and used to namespace every artifact
/// the request produces, so concurrent conversions never share output names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversionId(Uuid);

impl ConversionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a ConversionId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a ConversionId from a UUID string.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ConversionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hyphenated lowercase; artifact names depend on this exact form.
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for ConversionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
