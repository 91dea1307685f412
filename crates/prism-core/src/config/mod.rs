//! Configuration management for Prism.
//!
//! Configuration is loaded from the platform config directory (or an explicit
//! path) with defaults for every field, so an empty or missing file is valid.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Prism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Feature store and index locations
    pub storage: StorageConfig,

    /// Extractor parameters
    pub extraction: ExtractionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.prism.prism/config.toml
    /// - Linux: ~/.config/prism/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\prism\config\config.toml
    ///
    /// Falls back to ~/.prism/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "prism", "prism")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".prism").join("config.toml")
            })
    }

    /// Resolved feature-store directory (with ~ expansion).
    pub fn feature_dir(&self) -> PathBuf {
        expand(&self.storage.feature_dir)
    }

    /// Resolved index file path (with ~ expansion).
    pub fn index_path(&self) -> PathBuf {
        expand(&self.storage.index_path)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.processing.parallel_workers >= 1);
        assert_eq!(config.limits.max_file_size_mb, 100);
        assert_eq!(config.extraction.edges.low_threshold, 150.0);
        assert_eq!(config.extraction.edges.high_threshold, 200.0);
        assert_eq!(config.extraction.entropy.radius, 1);
        assert_eq!(config.storage.index_format, "csv");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("[storage]"));
        assert!(toml.contains("[extraction.keypoints]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nfeature_dir = \"/tmp/features\"\n\n[extraction.entropy]\nradius = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.feature_dir(), PathBuf::from("/tmp/features"));
        assert_eq!(config.extraction.entropy.radius, 2);
        assert_eq!(config.extraction.keypoints.octave_layers, 3);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing]\nparallel_workers = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let mut config = Config::default();
        config.storage.index_path = PathBuf::from("~/index.csv");
        assert!(!config.index_path().to_string_lossy().starts_with('~'));
    }
}
