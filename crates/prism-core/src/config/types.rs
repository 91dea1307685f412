//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images processed concurrently
    pub parallel_workers: usize,

    /// Supported input formats (file extensions, case-insensitive)
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: num_cpus::get(),
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "gif".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// Where and how feature containers and the index are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one `<identifier>.npz` container per image
    pub feature_dir: PathBuf,

    /// Metadata index file
    pub index_path: PathBuf,

    /// Index format: "csv", "json" or "jsonl"
    pub index_format: String,

    /// Deflate dataset entries instead of storing them uncompressed
    pub compress: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            feature_dir: PathBuf::from("./visualize/features"),
            index_path: PathBuf::from("./visualize/dataframe.csv"),
            index_format: "csv".to_string(),
            compress: false,
        }
    }
}

/// Per-extractor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub edges: EdgeConfig,
    pub entropy: EntropyConfig,
    pub keypoints: KeypointConfig,
}

/// Hysteresis thresholds for the edge detector (on L1 gradient magnitude).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 150.0,
            high_threshold: 200.0,
        }
    }
}

/// Local entropy neighbourhood.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Disk footprint radius in pixels
    pub radius: usize,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

/// Scale-space keypoint detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypointConfig {
    /// Scales sampled per octave
    pub octave_layers: usize,

    /// Rejects weak keypoints in low-contrast regions (scaled by `octave_layers`)
    pub contrast_threshold: f32,

    /// Maximum principal-curvature ratio before a point is treated as an edge
    pub edge_threshold: f32,

    /// Blur of the base scale
    pub sigma: f32,

    /// Keep only the strongest N keypoints (0 keeps all)
    pub max_keypoints: usize,

    /// Draw on the intensity image instead of the color image
    pub draw_on_intensity: bool,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            octave_layers: 3,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            sigma: 1.6,
            max_keypoints: 0,
            draw_on_intensity: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
