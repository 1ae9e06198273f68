//! Property tests for classification, dimension math and artifact naming.

use proptest::prelude::*;

use gerber_render::classifier::{classify, side_for};
use gerber_render::dimensions::{average_mm, pixels_to_mm};
use gerber_render::{ArtifactKey, ConversionError, ConversionId, Side, DPMM};

fn entry_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z_/]{1,12}\\.gbr",
        "[A-Za-z_/]{0,6}Top[A-Za-z_]{0,6}\\.gbr",
        "[A-Za-z_/]{1,12}\\.(txt|xln|GBR|drl)",
    ]
}

proptest! {
    #[test]
    fn prop_classification_partitions_layers(names in prop::collection::vec(entry_name(), 0..20)) {
        let layers: Vec<&String> = names.iter().filter(|n| n.ends_with(".gbr")).collect();

        match classify(&names) {
            Ok(classification) => {
                prop_assert!(!layers.is_empty());
                prop_assert_eq!(classification.len(), layers.len());
                prop_assert!(classification.top.iter().all(|n| n.contains("Top")));
                prop_assert!(classification.bottom.iter().all(|n| !n.contains("Top")));

                // Each side keeps archive order.
                let expected_top: Vec<&String> =
                    layers.iter().copied().filter(|n| side_for(n) == Side::Top).collect();
                let actual_top: Vec<&String> = classification.top.iter().collect();
                prop_assert_eq!(actual_top, expected_top);
            }
            Err(e) => {
                prop_assert!(layers.is_empty());
                prop_assert!(matches!(e, ConversionError::NoLayersFound));
            }
        }
    }

    #[test]
    fn prop_pixels_to_mm_is_nearest(pixels in 0u32..10_000_000) {
        let mm = pixels_to_mm(pixels);
        // |mm * DPMM - pixels| <= DPMM / 2
        let diff = (i64::from(mm) * i64::from(DPMM) - i64::from(pixels)).abs();
        prop_assert!(diff * 2 <= i64::from(DPMM));
    }

    #[test]
    fn prop_pixels_to_mm_is_monotonic(a in 0u32..1_000_000, b in 0u32..1_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(pixels_to_mm(lo) <= pixels_to_mm(hi));
    }

    #[test]
    fn prop_average_is_bounded(values in prop::collection::vec(0u32..100_000, 1..8)) {
        let avg = average_mm(&values);
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        prop_assert!(avg >= min && avg <= max);
    }

    #[test]
    fn prop_artifact_names_parse_back(bits in any::<u128>(), top in any::<bool>()) {
        let side = if top { Side::Top } else { Side::Bottom };
        let key = ArtifactKey::new(ConversionId::new(uuid::Uuid::from_u128(bits)), side);
        prop_assert_eq!(ArtifactKey::parse(&key.file_name()), Some(key));
    }

    #[test]
    fn prop_foreign_names_never_parse(name in "[./a-z_0-9]{0,40}") {
        prop_assume!(!name.starts_with("output_"));
        prop_assert_eq!(ArtifactKey::parse(&name), None);
    }
}

#[test]
fn test_average_of_nothing_is_zero() {
    assert_eq!(average_mm(&[]), 0);
}
