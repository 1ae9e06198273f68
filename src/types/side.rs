//! Board side for layer groups and rendered images.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical side of the board a layer group belongs to.
///
/// Ordered Top before Bottom so that results list the top image first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Component side.
    Top,
    /// Solder side. Also the default for any layer not marked as top.
    Bottom,
}

impl Side {
    /// Both sides, in result order.
    pub const ALL: [Side; 2] = [Side::Top, Side::Bottom];

    /// Parse side from its lowercase name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    /// Lowercase name used in artifact names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse_is_exact() {
        assert_eq!(Side::from_str("top"), Some(Side::Top));
        assert_eq!(Side::from_str("bottom"), Some(Side::Bottom));
        assert_eq!(Side::from_str("Top"), None);
        assert_eq!(Side::from_str(""), None);
    }

    #[test]
    fn test_side_ordering_top_first() {
        assert!(Side::Top < Side::Bottom);
        assert_eq!(Side::ALL, [Side::Top, Side::Bottom]);
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Bottom).unwrap(), "\"bottom\"");
    }
}
