//! Per-channel intensity histograms.

use ndarray::Array2;

use super::{ensure_extractable, FeatureExtractor};
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage, CHANNELS};

/// Number of histogram bins (one per 8-bit value).
pub const BINS: usize = 256;

/// Counts pixel values per channel: row `i`, column `c` holds the number of
/// pixels whose channel `c` equals `i`. Columns follow the R, G, B order.
pub struct ColorHistogramExtractor;

impl ColorHistogramExtractor {
    pub fn histogram(image: &RawImage) -> Array2<u64> {
        let mut hist = Array2::<u64>::zeros((BINS, CHANNELS));
        for px in image.pixels().rows() {
            for (c, &value) in px.iter().enumerate() {
                hist[[value as usize, c]] += 1;
            }
        }
        hist
    }
}

impl FeatureExtractor for ColorHistogramExtractor {
    fn dataset(&self) -> Dataset {
        Dataset::ColorHistogram
    }

    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError> {
        ensure_extractable(image)?;
        Ok(FeatureData::U64x2(Self::histogram(image)))
    }
}
