//! Layer classification.
//!
//! Entries ending in [`LAYER_EXTENSION`] are layer files; everything else in
//! the archive (drill files, readmes, pick-and-place data) is ignored. A layer
//! whose name contains [`TOP_MARKER`] goes to the top group, every other layer
//! goes to the bottom group. Bottom is never matched explicitly.

use crate::error::ConversionError;
use crate::types::Side;

/// Suffix identifying a layer file. Case-sensitive.
pub const LAYER_EXTENSION: &str = ".gbr";

/// Substring marking a top-side layer. Case-sensitive.
pub const TOP_MARKER: &str = "Top";

/// Entry names split by board side, each in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Names routed to the top group.
    pub top: Vec<String>,
    /// Names routed to the bottom group.
    pub bottom: Vec<String>,
}

impl Classification {
    /// Names for one side.
    pub fn names(&self, side: Side) -> &[String] {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    /// Total number of layer files.
    pub fn len(&self) -> usize {
        self.top.len() + self.bottom.len()
    }

    /// True when no layer file was found.
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}

/// True if `name` is a layer file.
pub fn is_layer_file(name: &str) -> bool {
    name.ends_with(LAYER_EXTENSION)
}

/// Side for a layer file name.
pub fn side_for(name: &str) -> Side {
    if name.contains(TOP_MARKER) {
        Side::Top
    } else {
        Side::Bottom
    }
}

/// Partition archive entry names into top and bottom groups.
///
/// Fails with [`ConversionError::NoLayersFound`] when no name ends in the
/// layer extension.
pub fn classify<I, S>(names: I) -> Result<Classification, ConversionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut classification = Classification::default();

    for name in names {
        let name = name.as_ref();
        if !is_layer_file(name) {
            continue;
        }
        match side_for(name) {
            Side::Top => classification.top.push(name.to_string()),
            Side::Bottom => classification.bottom.push(name.to_string()),
        }
    }

    if classification.is_empty() {
        return Err(ConversionError::NoLayersFound);
    }
    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_and_bottom_split() {
        let c = classify(["TopLayer.gbr", "BottomLayer.gbr", "TopSilk.gbr"]).unwrap();
        assert_eq!(c.top, vec!["TopLayer.gbr", "TopSilk.gbr"]);
        assert_eq!(c.bottom, vec!["BottomLayer.gbr"]);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_non_layer_entries_ignored() {
        let c = classify(["drill.drl", "README.md", "TopCopper.gbr", "Top.GBR"]).unwrap();
        assert_eq!(c.top, vec!["TopCopper.gbr"]);
        assert!(c.bottom.is_empty());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let c = classify(["top_copper.gbr", "TOP_mask.gbr"]).unwrap();
        assert!(c.top.is_empty());
        assert_eq!(c.names(Side::Bottom), ["top_copper.gbr", "TOP_mask.gbr"]);
    }

    #[test]
    fn test_unmarked_layers_default_to_bottom() {
        // Misnamed or unrelated layers land in bottom rather than being rejected.
        let c = classify(["Outline.gbr", "Mechanical1.gbr"]).unwrap();
        assert_eq!(c.bottom.len(), 2);
    }

    #[test]
    fn test_marker_anywhere_in_path() {
        let c = classify(["Top/copper.gbr", "board/LayerTopPaste.gbr"]).unwrap();
        assert_eq!(c.top.len(), 2);
    }

    #[test]
    fn test_no_layers_found() {
        assert!(matches!(
            classify(["notes.txt", "drill.xln"]),
            Err(ConversionError::NoLayersFound)
        ));
        assert!(matches!(
            classify(Vec::<String>::new()),
            Err(ConversionError::NoLayersFound)
        ));
    }
}
