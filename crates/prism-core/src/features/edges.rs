//! Two-threshold gradient edge detection (Canny).
//!
//! OpenCV's Canny on the intensity image with a 3×3 Sobel aperture and L1
//! gradient magnitude. No smoothing is applied before the gradient.

use opencv::core::Mat;
use opencv::imgproc;

use super::cv;
use super::{ensure_extractable, FeatureExtractor};
use crate::config::EdgeConfig;
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage};

/// Value of an edge pixel in the output mask.
pub const EDGE: u8 = 255;

const SOBEL_APERTURE: i32 = 3;

/// Produces an H × W mask with values in {0, 255}.
pub struct EdgeMapExtractor {
    config: EdgeConfig,
}

impl EdgeMapExtractor {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }
}

impl FeatureExtractor for EdgeMapExtractor {
    fn dataset(&self) -> Dataset {
        Dataset::EdgeMap
    }

    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError> {
        ensure_extractable(image)?;
        let gray = cv::gray_mat(image)?;
        let mut edges = Mat::default();
        imgproc::canny(
            &gray,
            &mut edges,
            self.config.low_threshold as f64,
            self.config.high_threshold as f64,
            SOBEL_APERTURE,
            false,
        )?;
        Ok(FeatureData::U8x2(cv::to_array2(&edges)?))
    }
}
