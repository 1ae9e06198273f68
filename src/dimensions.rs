//! Pixel to millimeter conversion.
//!
//! All conversions use [`DPMM`] and one rounding rule: integer division
//! rounded half up, so 100 px at 40 dpmm is 3 mm.

use std::io::Cursor;

use image::ImageReader;

use crate::types::{DimensionReport, ImageEntry};
use crate::DPMM;

/// Error type for raster measurement.
#[derive(Debug, thiserror::Error)]
#[error("Unreadable raster: {0}")]
pub struct MeasureError(String);

/// Convert a pixel count to whole millimeters.
pub fn pixels_to_mm(pixels: u32) -> u32 {
    divide_rounded(u64::from(pixels), u64::from(DPMM))
}

/// Average of millimeter values, rounded half up. Zero for no values.
pub fn average_mm(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    divide_rounded(sum, values.len() as u64)
}

/// Read pixel width and height from a PNG header.
pub fn measure_png(bytes: &[u8]) -> Result<(u32, u32), MeasureError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MeasureError(e.to_string()))?
        .into_dimensions()
        .map_err(|e| MeasureError(e.to_string()))
}

/// Average width and height across entries.
pub fn average_of(entries: &[ImageEntry]) -> DimensionReport {
    let widths: Vec<u32> = entries.iter().map(|e| e.dimensions.width_mm).collect();
    let heights: Vec<u32> = entries.iter().map(|e| e.dimensions.height_mm).collect();
    DimensionReport {
        width_mm: average_mm(&widths),
        height_mm: average_mm(&heights),
    }
}

impl DimensionReport {
    /// Report for a raster of the given pixel extents.
    pub fn from_pixels(width_px: u32, height_px: u32) -> Self {
        Self {
            width_mm: pixels_to_mm(width_px),
            height_mm: pixels_to_mm(height_px),
        }
    }

    /// Measure a PNG byte stream.
    pub fn from_png(bytes: &[u8]) -> Result<Self, MeasureError> {
        let (w, h) = measure_png(bytes)?;
        Ok(Self::from_pixels(w, h))
    }
}

// round(n / d) with ties going up, exact in integers.
fn divide_rounded(n: u64, d: u64) -> u32 {
    ((2 * n + d) / (2 * d)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use image::{ImageFormat, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn entry(width_mm: u32, height_mm: u32) -> ImageEntry {
        ImageEntry {
            name: "x.png".into(),
            side: Side::Top,
            dimensions: DimensionReport { width_mm, height_mm },
        }
    }

    #[test]
    fn test_pixels_to_mm_rounding() {
        assert_eq!(pixels_to_mm(0), 0);
        assert_eq!(pixels_to_mm(19), 0);
        assert_eq!(pixels_to_mm(20), 1); // 0.5 rounds up
        assert_eq!(pixels_to_mm(40), 1);
        assert_eq!(pixels_to_mm(100), 3); // 2.5 rounds up
        assert_eq!(pixels_to_mm(200), 5);
        assert_eq!(pixels_to_mm(259), 6);
        assert_eq!(pixels_to_mm(260), 7);
    }

    #[test]
    fn test_pixels_to_mm_no_overflow_at_max() {
        assert_eq!(pixels_to_mm(u32::MAX), ((u64::from(u32::MAX) + 20) / 40) as u32);
    }

    #[test]
    fn test_average_mm() {
        assert_eq!(average_mm(&[]), 0);
        assert_eq!(average_mm(&[3]), 3);
        assert_eq!(average_mm(&[3, 5]), 4);
        assert_eq!(average_mm(&[2, 3]), 3); // 2.5 rounds up
        assert_eq!(average_mm(&[0, 0, 1]), 0);
        assert_eq!(average_mm(&[0, 1, 1]), 1);
    }

    #[test]
    fn test_average_of_entries() {
        assert_eq!(average_of(&[]), DimensionReport::default());
        let avg = average_of(&[entry(3, 5), entry(4, 8)]);
        assert_eq!(avg, DimensionReport { width_mm: 4, height_mm: 7 });
    }

    #[test]
    fn test_measure_png() {
        assert_eq!(measure_png(&png(100, 200)).unwrap(), (100, 200));
        let report = DimensionReport::from_png(&png(100, 200)).unwrap();
        assert_eq!(report, DimensionReport { width_mm: 3, height_mm: 5 });
    }

    #[test]
    fn test_measure_rejects_non_image() {
        assert!(measure_png(b"definitely not a png").is_err());
    }
}
