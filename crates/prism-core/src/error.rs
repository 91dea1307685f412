//! Error types for the Prism feature-extraction pipeline.
//!
//! Errors are organized by stage so that a failed run always names the image
//! (by path or identifier) and the dataset involved.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{Dataset, ImageId};

/// Top-level error type for Prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source directory does not exist or is not a directory
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// A directory entry could not be read while listing the source
    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Two files in the source directory map to the same identifier
    #[error("Duplicate image identifier '{id}': {first} and {second}")]
    DuplicateIdentifier {
        id: ImageId,
        first: PathBuf,
        second: PathBuf,
    },

    /// An extractor could not process a decoded image
    #[error("Extraction of {dataset} failed for '{id}': {source}")]
    Extraction {
        id: ImageId,
        dataset: Dataset,
        #[source]
        source: ExtractError,
    },

    /// Feature store container could not be created, read or written
    #[error("Storage error for {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// A container is missing datasets at finalization time
    #[error("Feature bundle for '{id}' is incomplete (missing: {})", missing.join(", "))]
    IncompleteBundle { id: ImageId, missing: Vec<String> },

    /// The run was cancelled before every image finished
    #[error("Run cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl PipelineError {
    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Reasons a single extractor rejects a decoded buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Zero-sized image
    #[error("image is empty ({height}x{width})")]
    EmptyImage { height: usize, width: usize },

    /// Buffer does not have the canonical three channels
    #[error("expected 3 channels, found {0}")]
    UnsupportedChannels(usize),

    /// An OpenCV operator failed
    #[error("opencv: {0}")]
    OpenCv(String),
}

impl From<opencv::Error> for ExtractError {
    fn from(err: opencv::Error) -> Self {
        Self::OpenCv(err.to_string())
    }
}

/// Convenience type alias for Prism results.
pub type Result<T> = std::result::Result<T, PrismError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_bundle_lists_missing_keys() {
        let err = PipelineError::IncompleteBundle {
            id: ImageId::new("a"),
            missing: vec!["EdgeMap".into(), "EntropyMap".into()],
        };
        assert_eq!(
            err.to_string(),
            "Feature bundle for 'a' is incomplete (missing: EdgeMap, EntropyMap)"
        );
    }

    #[test]
    fn test_extraction_error_names_image_and_dataset() {
        let err = PipelineError::Extraction {
            id: ImageId::new("cat"),
            dataset: Dataset::EdgeMap,
            source: ExtractError::EmptyImage {
                height: 0,
                width: 4,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("EdgeMap"));
        assert!(msg.contains("'cat'"));
        assert!(msg.contains("0x4"));
    }
}
