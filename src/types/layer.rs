//! Layer files and per-side layer groups.

use serde::{Deserialize, Serialize};

use super::side::Side;

/// One Gerber layer read out of an uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFile {
    /// Original in-archive path.
    pub name: String,
    /// Decoded layer source.
    pub content: String,
}

impl LayerFile {
    /// Create a new layer file.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Final path component of the in-archive name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// The layer files of one board side, in archive order.
///
/// Archive order decides the order in which layers are handed to the render
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    /// Side shared by every layer in the group.
    pub side: Side,
    /// Layers in archive order.
    pub layers: Vec<LayerFile>,
}

impl LayerGroup {
    /// Create an empty group for a side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            layers: Vec::new(),
        }
    }

    /// Append a layer.
    pub fn push(&mut self, layer: LayerFile) {
        self.layers.push(layer);
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when no render job should be issued for this side.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
