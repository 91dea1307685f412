//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::index::IndexFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if IndexFormat::parse(&self.storage.index_format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "storage.index_format must be csv, json or jsonl (got '{}')",
                self.storage.index_format
            )));
        }

        let edges = &self.extraction.edges;
        if edges.low_threshold < 0.0 || edges.low_threshold > edges.high_threshold {
            return Err(ConfigError::ValidationError(
                "extraction.edges thresholds must satisfy 0 <= low_threshold <= high_threshold"
                    .into(),
            ));
        }
        if self.extraction.entropy.radius == 0 {
            return Err(ConfigError::ValidationError(
                "extraction.entropy.radius must be > 0".into(),
            ));
        }

        let keypoints = &self.extraction.keypoints;
        if keypoints.octave_layers == 0 {
            return Err(ConfigError::ValidationError(
                "extraction.keypoints.octave_layers must be > 0".into(),
            ));
        }
        if keypoints.sigma <= 0.5 {
            return Err(ConfigError::ValidationError(
                "extraction.keypoints.sigma must be > 0.5".into(),
            ));
        }
        if keypoints.contrast_threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "extraction.keypoints.contrast_threshold must be >= 0".into(),
            ));
        }
        if keypoints.edge_threshold <= 1.0 {
            return Err(ConfigError::ValidationError(
                "extraction.keypoints.edge_threshold must be > 1".into(),
            ));
        }
        Ok(())
    }
}
