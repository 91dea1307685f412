//! Feature extractors.
//!
//! Each extractor is a stateless transform from one decoded [`RawImage`] to one
//! dataset of the feature bundle:
//! - **color_space**: distinct colors present in the image
//! - **histogram**: per-channel 256-bin intensity counts
//! - **edges**: two-threshold gradient edge mask
//! - **entropy**: local Shannon entropy map
//! - **keypoints**: scale-space keypoints rendered onto the image
//!
//! Conversions to and from OpenCV matrices live in `cv`.

pub mod color_space;
pub mod cv;
pub mod edges;
pub mod entropy;
pub mod histogram;
pub mod keypoints;

pub use color_space::ColorSpaceExtractor;
pub use edges::EdgeMapExtractor;
pub use entropy::EntropyMapExtractor;
pub use histogram::ColorHistogramExtractor;
pub use keypoints::{KeypointOverlayExtractor, SiftDetector};

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage, CHANNELS};

/// A stateless transform producing one dataset from a decoded image.
pub trait FeatureExtractor: Send + Sync {
    /// Dataset this extractor fills.
    fn dataset(&self) -> Dataset;

    /// Compute the dataset for one image.
    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError>;
}

/// Reject buffers no extractor can work with.
pub(crate) fn ensure_extractable(image: &RawImage) -> Result<(), ExtractError> {
    if image.height() == 0 || image.width() == 0 {
        return Err(ExtractError::EmptyImage {
            height: image.height(),
            width: image.width(),
        });
    }
    if image.channels() != CHANNELS {
        return Err(ExtractError::UnsupportedChannels(image.channels()));
    }
    Ok(())
}

/// The five extractors of a feature bundle, built from configuration.
pub struct ExtractorSet {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl ExtractorSet {
    pub fn new(config: &ExtractionConfig) -> Self {
        let extractors: Vec<Box<dyn FeatureExtractor>> = vec![
            Box::new(ColorSpaceExtractor),
            Box::new(ColorHistogramExtractor),
            Box::new(EdgeMapExtractor::new(config.edges.clone())),
            Box::new(EntropyMapExtractor::new(config.entropy.clone())),
            Box::new(KeypointOverlayExtractor::new(config.keypoints.clone())),
        ];
        Self { extractors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FeatureExtractor> {
        self.extractors.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
