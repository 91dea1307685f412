//! Distinct colors present in an image.

use ndarray::Array2;

use super::{ensure_extractable, FeatureExtractor};
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage, CHANNELS};

/// Collects every distinct RGB color once, sorted lexicographically by (R, G, B).
pub struct ColorSpaceExtractor;

impl ColorSpaceExtractor {
    /// Distinct colors as `[r, g, b]` triples in canonical order.
    pub fn distinct_colors(image: &RawImage) -> Vec<[u8; 3]> {
        let mut colors: Vec<[u8; 3]> = image
            .pixels()
            .rows()
            .into_iter()
            .map(|px| [px[0], px[1], px[2]])
            .collect();
        colors.sort_unstable();
        colors.dedup();
        colors
    }
}

impl FeatureExtractor for ColorSpaceExtractor {
    fn dataset(&self) -> Dataset {
        Dataset::ColorSpace
    }

    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError> {
        ensure_extractable(image)?;
        let colors = Self::distinct_colors(image);
        let rows = colors.len();
        let flat: Vec<u8> = colors.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((rows, CHANNELS), flat)
            .expect("flattened color triples fill an N x 3 matrix");
        Ok(FeatureData::U8x2(matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn extract(image: &RawImage) -> Array2<u8> {
        match ColorSpaceExtractor.extract(image).unwrap() {
            FeatureData::U8x2(m) => m,
            other => panic!("unexpected payload {:?}", other.dtype()),
        }
    }

    #[test]
    fn test_solid_white_has_single_color() {
        let image = RawImage::from_array(Array3::from_elem((2, 2, 3), 255));
        assert_eq!(extract(&image), array![[255, 255, 255]]);
    }

    #[test]
    fn test_colors_are_distinct_sorted_and_present() {
        let mut pixels = Array3::<u8>::zeros((2, 3, 3));
        let palette = [[9, 0, 0], [1, 2, 3], [9, 0, 0], [1, 2, 2], [0, 0, 0], [1, 2, 3]];
        for (i, color) in palette.iter().enumerate() {
            for c in 0..3 {
                pixels[[i / 3, i % 3, c]] = color[c];
            }
        }
        let image = RawImage::from_array(pixels);
        let colors = extract(&image);

        assert_eq!(colors, array![[0, 0, 0], [1, 2, 2], [1, 2, 3], [9, 0, 0]]);
        assert!(colors.nrows() <= image.pixel_count());
        for row in colors.rows() {
            assert!(palette.iter().any(|p| p[..] == row.to_vec()[..]));
        }
    }

    #[test]
    fn test_channel_order_is_not_swapped() {
        let mut pixels = Array3::<u8>::zeros((1, 1, 3));
        pixels[[0, 0, 0]] = 10;
        pixels[[0, 0, 2]] = 200;
        let colors = extract(&RawImage::from_array(pixels));
        assert_eq!(colors, array![[10, 0, 200]]);
    }
}
